//! Recon report: wire form (strict structured-output schema) and internal
//! form (idiomatic optionals, parsed inner objects), plus the converter
//! between them.
//!
//! The wire form is what the model's structured-output schema validates
//! against: every key is present, optionality is encoded as `null` rather
//! than an absent key, and values the outer schema validator can't express
//! as an arbitrary map (`sampleData`) travel as an opaque JSON string. The
//! internal form reconstitutes those into idiomatic Rust; callers only ever
//! see the internal form after `ReconReport::from_wire`.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

// ---------------------------------------------------------------------
// Enumerations (shared string-keyed parse/display, wire-safe as plain
// lowercase strings so the schema can enumerate them).
// ---------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SiteType {
    StaticHtml,
    Spa,
    ApiFirst,
    Hybrid,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PagePurpose {
    Search,
    Listing,
    Detail,
    Login,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaginationType {
    NextLink,
    UrlParam,
    InfiniteScroll,
    LoadMore,
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    FormSearch,
    Listing,
    ApiDirect,
    BrowserOnly,
}

// ---------------------------------------------------------------------
// Wire form
// ---------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormFieldWire {
    pub name: String,
    pub selector: String,
    #[serde(rename = "type")]
    pub field_type: String,
    pub required: bool,
    pub options: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginationWire {
    #[serde(rename = "type")]
    pub pagination_type: PaginationType,
    pub next_selector: Option<String>,
    pub url_param_name: Option<String>,
    pub url_param_start: Option<i64>,
    pub load_more_selector: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageWire {
    pub url: String,
    pub purpose: PagePurpose,
    pub form_fields: Option<Vec<FormFieldWire>>,
    pub data_elements: Option<Vec<String>>,
    pub pagination: Option<PaginationWire>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiEndpointWire {
    pub url: String,
    pub method: String,
    pub content_type: Option<String>,
    pub response_shape: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AntiBotWire {
    pub captcha: bool,
    pub cloudflare: bool,
    pub rate_limit: bool,
    pub requires_auth: bool,
}

/// Strict-mode-safe structured-output shape. Every field is present;
/// optionality is `null`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconReportWire {
    pub url: String,
    pub site_name: String,
    pub site_type: SiteType,
    pub pages: Vec<PageWire>,
    pub api_endpoints: Option<Vec<ApiEndpointWire>>,
    pub anti_bot: AntiBotWire,
    /// Records serialized as a JSON string, since the outer schema
    /// validator can't express "array of arbitrary objects".
    pub sample_data: Option<String>,
    pub suggested_strategy: Strategy,
}

// ---------------------------------------------------------------------
// Internal form
// ---------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormField {
    pub name: String,
    pub selector: String,
    pub field_type: String,
    pub required: bool,
    pub options: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Pagination {
    NextLink { selector: Option<String> },
    UrlParam { param_name: Option<String>, start: Option<i64> },
    InfiniteScroll,
    LoadMore { selector: Option<String> },
    None,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page {
    pub url: String,
    pub purpose: PagePurpose,
    pub form_fields: Option<Vec<FormField>>,
    pub data_elements: Option<Vec<String>>,
    pub pagination: Option<Pagination>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiEndpoint {
    pub url: String,
    pub method: String,
    pub content_type: Option<String>,
    pub response_shape: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct AntiBot {
    pub captcha: bool,
    pub cloudflare: bool,
    pub rate_limit: bool,
    pub requires_auth: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconReport {
    pub url: String,
    pub site_name: String,
    pub site_type: SiteType,
    pub pages: Vec<Page>,
    pub api_endpoints: Option<Vec<ApiEndpoint>>,
    pub anti_bot: AntiBot,
    pub sample_data: Option<Vec<Value>>,
    pub suggested_strategy: Strategy,
}

#[derive(Debug, Error)]
pub enum ReconConversionError {
    #[error("sample_data was not valid JSON: {0}")]
    InvalidSampleData(#[from] serde_json::Error),
}

impl ReconReport {
    /// Parse the model's structured output into the idiomatic internal
    /// form. The only fallible step is `sampleData`, which is carried as an
    /// opaque JSON string on the wire.
    pub fn from_wire(wire: ReconReportWire) -> Result<Self, ReconConversionError> {
        let sample_data = wire
            .sample_data
            .as_deref()
            .map(serde_json::from_str::<Vec<Value>>)
            .transpose()?;

        Ok(Self {
            url: wire.url,
            site_name: wire.site_name,
            site_type: wire.site_type,
            pages: wire.pages.into_iter().map(Page::from_wire).collect(),
            api_endpoints: wire.api_endpoints.map(|endpoints| {
                endpoints
                    .into_iter()
                    .map(|e| ApiEndpoint {
                        url: e.url,
                        method: e.method,
                        content_type: e.content_type,
                        response_shape: e.response_shape,
                    })
                    .collect()
            }),
            anti_bot: AntiBot {
                captcha: wire.anti_bot.captcha,
                cloudflare: wire.anti_bot.cloudflare,
                rate_limit: wire.anti_bot.rate_limit,
                requires_auth: wire.anti_bot.requires_auth,
            },
            sample_data,
            suggested_strategy: wire.suggested_strategy,
        })
    }

    /// Render back to the wire shape (used to persist `recon-report.json`
    /// in the exact form the schema produced it, and to satisfy the
    /// wire→internal→wire round-trip law).
    #[must_use]
    pub fn to_wire(&self) -> ReconReportWire {
        ReconReportWire {
            url: self.url.clone(),
            site_name: self.site_name.clone(),
            site_type: self.site_type,
            pages: self.pages.iter().map(Page::to_wire).collect(),
            api_endpoints: self.api_endpoints.as_ref().map(|endpoints| {
                endpoints
                    .iter()
                    .map(|e| ApiEndpointWire {
                        url: e.url.clone(),
                        method: e.method.clone(),
                        content_type: e.content_type.clone(),
                        response_shape: e.response_shape.clone(),
                    })
                    .collect()
            }),
            anti_bot: AntiBotWire {
                captcha: self.anti_bot.captcha,
                cloudflare: self.anti_bot.cloudflare,
                rate_limit: self.anti_bot.rate_limit,
                requires_auth: self.anti_bot.requires_auth,
            },
            sample_data: self
                .sample_data
                .as_ref()
                .map(|records| serde_json::to_string(records).unwrap_or_default()),
            suggested_strategy: self.suggested_strategy,
        }
    }
}

impl Page {
    fn from_wire(wire: PageWire) -> Self {
        Self {
            url: wire.url,
            purpose: wire.purpose,
            form_fields: wire.form_fields.map(|fields| {
                fields
                    .into_iter()
                    .map(|f| FormField {
                        name: f.name,
                        selector: f.selector,
                        field_type: f.field_type,
                        required: f.required,
                        options: f.options,
                    })
                    .collect()
            }),
            data_elements: wire.data_elements,
            pagination: wire.pagination.map(Pagination::from_wire),
        }
    }

    fn to_wire(&self) -> PageWire {
        PageWire {
            url: self.url.clone(),
            purpose: self.purpose,
            form_fields: self.form_fields.as_ref().map(|fields| {
                fields
                    .iter()
                    .map(|f| FormFieldWire {
                        name: f.name.clone(),
                        selector: f.selector.clone(),
                        field_type: f.field_type.clone(),
                        required: f.required,
                        options: f.options.clone(),
                    })
                    .collect()
            }),
            data_elements: self.data_elements.clone(),
            pagination: self.pagination.as_ref().map(Pagination::to_wire),
        }
    }
}

impl Pagination {
    fn from_wire(wire: PaginationWire) -> Self {
        match wire.pagination_type {
            PaginationType::NextLink => Self::NextLink {
                selector: wire.next_selector,
            },
            PaginationType::UrlParam => Self::UrlParam {
                param_name: wire.url_param_name,
                start: wire.url_param_start,
            },
            PaginationType::InfiniteScroll => Self::InfiniteScroll,
            PaginationType::LoadMore => Self::LoadMore {
                selector: wire.load_more_selector,
            },
            PaginationType::None => Self::None,
        }
    }

    fn to_wire(&self) -> PaginationWire {
        match self {
            Self::NextLink { selector } => PaginationWire {
                pagination_type: PaginationType::NextLink,
                next_selector: selector.clone(),
                url_param_name: None,
                url_param_start: None,
                load_more_selector: None,
            },
            Self::UrlParam { param_name, start } => PaginationWire {
                pagination_type: PaginationType::UrlParam,
                next_selector: None,
                url_param_name: param_name.clone(),
                url_param_start: *start,
                load_more_selector: None,
            },
            Self::InfiniteScroll => PaginationWire {
                pagination_type: PaginationType::InfiniteScroll,
                next_selector: None,
                url_param_name: None,
                url_param_start: None,
                load_more_selector: None,
            },
            Self::LoadMore { selector } => PaginationWire {
                pagination_type: PaginationType::LoadMore,
                next_selector: None,
                url_param_name: None,
                url_param_start: None,
                load_more_selector: selector.clone(),
            },
            Self::None => PaginationWire {
                pagination_type: PaginationType::None,
                next_selector: None,
                url_param_name: None,
                url_param_start: None,
                load_more_selector: None,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_wire() -> ReconReportWire {
        ReconReportWire {
            url: "https://example.com".into(),
            site_name: "Example".into(),
            site_type: SiteType::Hybrid,
            pages: vec![PageWire {
                url: "https://example.com/search".into(),
                purpose: PagePurpose::Search,
                form_fields: Some(vec![FormFieldWire {
                    name: "query".into(),
                    selector: "#q".into(),
                    field_type: "text".into(),
                    required: true,
                    options: None,
                }]),
                data_elements: Some(vec![".result-row".into()]),
                pagination: Some(PaginationWire {
                    pagination_type: PaginationType::NextLink,
                    next_selector: Some("a.next".into()),
                    url_param_name: None,
                    url_param_start: None,
                    load_more_selector: None,
                }),
            }],
            api_endpoints: Some(vec![ApiEndpointWire {
                url: "https://example.com/api/search".into(),
                method: "GET".into(),
                content_type: Some("application/json".into()),
                response_shape: Some("{ results: [...] }".into()),
            }]),
            anti_bot: AntiBotWire {
                captcha: false,
                cloudflare: true,
                rate_limit: false,
                requires_auth: false,
            },
            sample_data: Some(r#"[{"name":"foo"}]"#.into()),
            suggested_strategy: Strategy::FormSearch,
        }
    }

    #[test]
    fn wire_to_internal_to_wire_round_trips() {
        let wire = sample_wire();
        let internal = ReconReport::from_wire(wire.clone()).unwrap();
        let back = internal.to_wire();

        assert_eq!(wire.url, back.url);
        assert_eq!(wire.site_name, back.site_name);
        assert_eq!(wire.pages.len(), back.pages.len());
        assert_eq!(
            wire.pages[0].pagination.as_ref().unwrap().pagination_type,
            back.pages[0].pagination.as_ref().unwrap().pagination_type
        );

        // JSON-string-of-records vs parsed-then-reserialized: compare the
        // parsed value, not the byte string, per the round-trip law's
        // "normalisation of ... JSON-string-of-record-vs-object" clause.
        let wire_sample: Value = serde_json::from_str(wire.sample_data.as_ref().unwrap()).unwrap();
        let back_sample: Value = serde_json::from_str(back.sample_data.as_ref().unwrap()).unwrap();
        assert_eq!(wire_sample, back_sample);
    }

    #[test]
    fn malformed_sample_data_is_a_conversion_error() {
        let mut wire = sample_wire();
        wire.sample_data = Some("not json".into());
        let result = ReconReport::from_wire(wire);
        assert!(result.is_err());
    }

    #[test]
    fn missing_optionals_survive_round_trip_as_none() {
        let mut wire = sample_wire();
        wire.api_endpoints = None;
        wire.sample_data = None;
        wire.pages[0].form_fields = None;
        wire.pages[0].pagination = None;

        let internal = ReconReport::from_wire(wire).unwrap();
        let back = internal.to_wire();
        assert!(back.api_endpoints.is_none());
        assert!(back.sample_data.is_none());
        assert!(back.pages[0].form_fields.is_none());
        assert!(back.pages[0].pagination.is_none());
    }
}
