//! Douban list API clients.

mod list;
mod types;

pub use list::{ListApi, ListFlavor};
pub use types::{ListInfo, ListItem, Rating, RelatedChart, RelatedCharts};
