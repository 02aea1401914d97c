//! Typed views of the Douban list API payloads.

use serde::{Deserialize, Deserializer, Serialize};

/// One entry of a list, as cached and as consumed by the HTTP layer.
///
/// Only the fields the proxy actually uses are kept; the upstream payload
/// carries much more.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListItem {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub rating: Option<Rating>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rating {
    #[serde(default)]
    pub value: Option<f64>,
}

impl ListItem {
    pub fn is_movie(&self) -> bool {
        self.kind == "movie"
    }

    /// The Douban subject id, derived from the last non-empty path segment
    /// of the item URL (e.g. `https://movie.douban.com/subject/1292052/`).
    pub fn douban_id(&self) -> Option<String> {
        let url = reqwest::Url::parse(&self.url).ok()?;
        url.path_segments()?
            .filter(|segment| !segment.is_empty())
            .next_back()
            .map(str::to_string)
    }

    pub fn rating_value(&self) -> Option<f64> {
        self.rating.as_ref().and_then(|r| r.value)
    }
}

/// List metadata, used by bootstrap to discover related lists.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListInfo {
    #[serde(default)]
    pub related_charts: Option<RelatedCharts>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RelatedCharts {
    #[serde(default)]
    pub items: Vec<RelatedChart>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RelatedChart {
    #[serde(deserialize_with = "id_as_string")]
    pub id: String,
}

/// Douban ids appear both as strings ("movie_top250") and as bare numbers.
fn id_as_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum IdRepr {
        String(String),
        Number(i64),
    }

    Ok(match IdRepr::deserialize(deserializer)? {
        IdRepr::String(s) => s,
        IdRepr::Number(n) => n.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(url: &str) -> ListItem {
        ListItem {
            kind: "movie".to_string(),
            title: "t".to_string(),
            url: url.to_string(),
            rating: None,
        }
    }

    #[test]
    fn test_douban_id_from_url() {
        assert_eq!(
            item("https://movie.douban.com/subject/1292052/").douban_id(),
            Some("1292052".to_string())
        );
        assert_eq!(
            item("https://movie.douban.com/subject/1292052").douban_id(),
            Some("1292052".to_string())
        );
        assert_eq!(item("not a url").douban_id(), None);
    }

    #[test]
    fn test_related_chart_numeric_id() {
        let info: ListInfo = serde_json::from_str(
            r#"{"related_charts": {"items": [{"id": 42}, {"id": "movie_top250"}]}}"#,
        )
        .unwrap();
        let ids: Vec<_> = info
            .related_charts
            .unwrap()
            .items
            .into_iter()
            .map(|c| c.id)
            .collect();
        assert_eq!(ids, vec!["42".to_string(), "movie_top250".to_string()]);
    }

    #[test]
    fn test_item_tolerates_missing_fields() {
        let item: ListItem = serde_json::from_str(r#"{"title": "x"}"#).unwrap();
        assert!(!item.is_movie());
        assert_eq!(item.rating_value(), None);
    }
}
