mod catalog;
mod pattern;

pub use catalog::CatalogView;
pub use pattern::PatternView;
