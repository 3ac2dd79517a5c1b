//! Sitemap protocol rendering (`<urlset>` documents).

use crate::error::Result;
use chrono::NaiveDate;
use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use serde::{Deserialize, Serialize};
use std::io;

pub const SITEMAP_NAMESPACE: &str = "http://www.sitemaps.org/schemas/sitemap/0.9";
pub const LASTMOD_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SitemapEntry {
    pub loc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lastmod: Option<NaiveDate>,
}

impl SitemapEntry {
    pub fn lastmod_string(&self) -> Option<String> {
        self.lastmod
            .map(|date| date.format(LASTMOD_FORMAT).to_string())
    }
}

/// Render entries as a sitemap XML document, one `<url>` per entry.
pub fn render_sitemap(entries: &[SitemapEntry]) -> Result<String> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);

    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

    let mut urlset = BytesStart::new("urlset");
    urlset.push_attribute(("xmlns", SITEMAP_NAMESPACE));
    writer.write_event(Event::Start(urlset))?;

    for entry in entries {
        writer.write_event(Event::Start(BytesStart::new("url")))?;
        write_text_element(&mut writer, "loc", &entry.loc)?;
        if let Some(lastmod) = entry.lastmod_string() {
            write_text_element(&mut writer, "lastmod", &lastmod)?;
        }
        writer.write_event(Event::End(BytesEnd::new("url")))?;
    }

    writer.write_event(Event::End(BytesEnd::new("urlset")))?;

    let mut xml = String::from_utf8(writer.into_inner())
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    xml.push('\n');
    Ok(xml)
}

fn write_text_element(writer: &mut Writer<Vec<u8>>, name: &str, text: &str) -> io::Result<()> {
    writer.write_event(Event::Start(BytesStart::new(name)))?;
    writer.write_event(Event::Text(BytesText::new(text)))?;
    writer.write_event(Event::End(BytesEnd::new(name)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_empty_urlset() {
        let xml = render_sitemap(&[]).unwrap();
        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
        assert!(xml.contains(SITEMAP_NAMESPACE));
        assert!(!xml.contains("<url>"));
    }

    #[test]
    fn test_render_lastmod_only_when_known() {
        let entries = vec![
            SitemapEntry {
                loc: "http://example.com".to_string(),
                lastmod: NaiveDate::from_ymd_opt(2015, 9, 15),
            },
            SitemapEntry {
                loc: "http://example.com/a".to_string(),
                lastmod: None,
            },
        ];

        let xml = render_sitemap(&entries).unwrap();

        assert_eq!(xml.matches("<url>").count(), 2);
        assert_eq!(xml.matches("<lastmod>").count(), 1);
        assert!(xml.contains("<loc>http://example.com</loc>"));
        assert!(xml.contains("<lastmod>2015-09-15</lastmod>"));
        assert!(xml.contains("<loc>http://example.com/a</loc>"));
    }

    #[test]
    fn test_render_escapes_locations() {
        let entries = vec![SitemapEntry {
            loc: "http://example.com/search?a=1&b=2".to_string(),
            lastmod: None,
        }];

        let xml = render_sitemap(&entries).unwrap();
        assert!(xml.contains("<loc>http://example.com/search?a=1&amp;b=2</loc>"));
    }

    #[test]
    fn test_entry_json_shape() {
        let entry = SitemapEntry {
            loc: "http://example.com".to_string(),
            lastmod: NaiveDate::from_ymd_opt(2015, 9, 15),
        };
        let json = serde_json::to_string(&entry).unwrap();
        assert_eq!(json, r#"{"loc":"http://example.com","lastmod":"2015-09-15"}"#);

        let bare = SitemapEntry {
            loc: "http://example.com/a".to_string(),
            lastmod: None,
        };
        assert_eq!(
            serde_json::to_string(&bare).unwrap(),
            r#"{"loc":"http://example.com/a"}"#
        );
    }
}
