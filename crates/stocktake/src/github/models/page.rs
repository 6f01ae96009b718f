use crate::github::Result;
use lazy_static::lazy_static;
use regex::{Regex, RegexBuilder};
use url::Url;

// -------------------------------------------------------------------------------------------------
// Page
// -------------------------------------------------------------------------------------------------
/// One page of a Link-header-paginated REST listing.
pub struct Page<T> {
    pub items: Vec<T>,
    pub links: HeaderLinks,
}

impl<T: serde::de::DeserializeOwned> Page<T> {
    pub async fn from_response(response: reqwest::Response) -> Result<Self> {
        let links = get_header_links(&response);
        let items = response.json().await?;
        Ok(Page { items, links })
    }
}

/// The pagination links GitHub exposes via the `Link` response header.
///
/// Only `rel="next"` is consumed; a page without it is the last page.
#[derive(Debug, Default)]
pub struct HeaderLinks {
    pub next: Option<Url>,
}

lazy_static! {
    static ref NEXT_LINK_PATTERN: Regex =
        RegexBuilder::new(r#"<([^>]+)>; \s* rel \s* = \s* "next""#)
            .ignore_whitespace(true)
            .build()
            .expect("next-link regex should compile");
}

fn get_header_links(response: &reqwest::Response) -> HeaderLinks {
    for value in response.headers().get_all(reqwest::header::LINK) {
        let value = match value.to_str() {
            Ok(v) => v,
            Err(_) => continue,
        };

        let next = NEXT_LINK_PATTERN
            .captures(value)
            .and_then(|captures| captures.get(1))
            .and_then(|capture| Url::parse(capture.as_str()).ok());

        if next.is_some() {
            return HeaderLinks { next };
        }
    }

    HeaderLinks { next: None }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn next_from(value: &str) -> Option<String> {
        NEXT_LINK_PATTERN
            .captures(value)
            .and_then(|captures| captures.get(1))
            .map(|capture| capture.as_str().to_string())
    }

    #[test]
    fn next_and_last_links() {
        let value = r#"<https://api.github.com/organizations/9919/repos?page=2>; rel="next", <https://api.github.com/organizations/9919/repos?page=7>; rel="last""#;
        assert_eq!(
            next_from(value),
            Some("https://api.github.com/organizations/9919/repos?page=2".to_string())
        );
    }

    #[test]
    fn last_link_only() {
        let value = r#"<https://api.github.com/organizations/9919/repos?page=7>; rel="last""#;
        assert_eq!(next_from(value), None);
    }

    #[test]
    fn empty_header() {
        assert_eq!(next_from(""), None);
    }
}
