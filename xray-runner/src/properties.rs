// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Recording Xray metadata from within a test.
//!
//! A test records metadata through a [`PropertyRecorder`]. Recording never fails: recorded values
//! are appended in order, and are checked and converted to report nodes once the test's call phase
//! is reported (see [`to_junit_properties`]).

use crate::errors::PropertyError;
use base64::{Engine, engine::general_purpose::STANDARD};
use serde::{Deserialize, Serialize};
use std::fmt;
use xray_junit::{Property, PropertyItem};

/// The kind of a recorded property.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub enum PropertyKind {
    /// A named attachment.
    Evidence,

    /// A free-text description. May be recorded more than once.
    Description,

    /// A one-line summary. Recorded at most once.
    Summary,

    /// The key of the Xray test issue. Recorded at most once.
    Key,

    /// The id of the Xray test issue. Recorded at most once.
    Id,
}

impl PropertyKind {
    /// Returns the name of the `property` element for this kind.
    pub fn property_name(self) -> &'static str {
        match self {
            Self::Evidence => "testrun_evidence",
            Self::Description => "test_description",
            Self::Summary => "test_summary",
            Self::Key => "test_key",
            Self::Id => "test_id",
        }
    }

    /// Returns true if at most one value of this kind may be recorded per test.
    pub fn is_single_valued(self) -> bool {
        match self {
            Self::Summary | Self::Key | Self::Id => true,
            Self::Evidence | Self::Description => false,
        }
    }
}

impl fmt::Display for PropertyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Evidence => "evidence",
            Self::Description => "description",
            Self::Summary => "summary",
            Self::Key => "key",
            Self::Id => "id",
        };
        f.write_str(s)
    }
}

/// A single property recorded by a test.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum RecordedProperty {
    /// An attachment, with its content already base64-encoded.
    Evidence {
        /// The file name of the attachment.
        name: String,

        /// The base64-encoded content.
        content_base64: String,
    },

    /// A description.
    Description {
        /// The description text.
        text: String,
    },

    /// A summary.
    Summary {
        /// The summary.
        value: String,
    },

    /// An Xray test key.
    Key {
        /// The key, e.g. `JIRA-1234`.
        value: String,
    },

    /// An Xray test id.
    Id {
        /// The id.
        value: String,
    },
}

impl RecordedProperty {
    /// Creates an evidence property from raw content, encoding it as base64.
    pub fn evidence(name: impl Into<String>, content: impl AsRef<[u8]>) -> Self {
        Self::Evidence {
            name: name.into(),
            content_base64: STANDARD.encode(content),
        }
    }

    /// Returns the kind of this property.
    pub fn kind(&self) -> PropertyKind {
        match self {
            Self::Evidence { .. } => PropertyKind::Evidence,
            Self::Description { .. } => PropertyKind::Description,
            Self::Summary { .. } => PropertyKind::Summary,
            Self::Key { .. } => PropertyKind::Key,
            Self::Id { .. } => PropertyKind::Id,
        }
    }

    fn single_value(&self) -> Option<&str> {
        match self {
            Self::Summary { value } | Self::Key { value } | Self::Id { value } => Some(value),
            Self::Evidence { .. } | Self::Description { .. } => None,
        }
    }
}

/// Records Xray metadata for the currently executing test.
///
/// A recorder belongs to exactly one test, so recorded data always attaches to that test.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct PropertyRecorder {
    properties: Vec<RecordedProperty>,
}

impl PropertyRecorder {
    /// Creates a new, empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one evidence attachment per entry, in iteration order.
    ///
    /// Content is base64-encoded at record time.
    pub fn record_evidence<I, N, C>(&mut self, evidence: I) -> &mut Self
    where
        I: IntoIterator<Item = (N, C)>,
        N: Into<String>,
        C: AsRef<[u8]>,
    {
        self.properties.extend(
            evidence
                .into_iter()
                .map(|(name, content)| RecordedProperty::evidence(name, content)),
        );
        self
    }

    /// Records a description. Descriptions are joined with newlines in recording order.
    pub fn record_description(&mut self, text: impl Into<String>) -> &mut Self {
        self.properties
            .push(RecordedProperty::Description { text: text.into() });
        self
    }

    /// Records the test summary.
    pub fn record_summary(&mut self, value: impl Into<String>) -> &mut Self {
        self.properties.push(RecordedProperty::Summary {
            value: value.into(),
        });
        self
    }

    /// Records the Xray test key.
    pub fn record_key(&mut self, value: impl Into<String>) -> &mut Self {
        self.properties.push(RecordedProperty::Key {
            value: value.into(),
        });
        self
    }

    /// Records the Xray test id.
    pub fn record_id(&mut self, value: impl Into<String>) -> &mut Self {
        self.properties.push(RecordedProperty::Id {
            value: value.into(),
        });
        self
    }

    /// Returns the properties recorded so far, in recording order.
    pub fn properties(&self) -> &[RecordedProperty] {
        &self.properties
    }

    /// Consumes the recorder, returning the recorded properties.
    pub fn into_properties(self) -> Vec<RecordedProperty> {
        self.properties
    }
}

/// Converts recorded properties into report nodes.
///
/// Nodes are produced in a fixed order: evidence, description, summary, key, id. All evidence
/// items share a single `testrun_evidence` property, and descriptions are joined with `\n`.
///
/// Returns an error if a single-valued kind was recorded more than once. An empty input produces
/// no nodes.
pub fn to_junit_properties(recorded: &[RecordedProperty]) -> Result<Vec<Property>, PropertyError> {
    for kind in [PropertyKind::Summary, PropertyKind::Key, PropertyKind::Id] {
        let values: Vec<String> = recorded
            .iter()
            .filter(|property| property.kind() == kind)
            .filter_map(|property| property.single_value().map(ToOwned::to_owned))
            .collect();
        if values.len() > 1
            && let Some(error) = PropertyError::more_than_one(kind, values)
        {
            return Err(error);
        }
    }

    let mut properties = Vec::new();

    let items: Vec<_> = recorded
        .iter()
        .filter_map(|property| match property {
            RecordedProperty::Evidence {
                name,
                content_base64,
            } => Some(PropertyItem::new(name.as_str(), content_base64.as_str())),
            _ => None,
        })
        .collect();
    if !items.is_empty() {
        properties.push(Property::items(
            PropertyKind::Evidence.property_name(),
            items,
        ));
    }

    let descriptions: Vec<_> = recorded
        .iter()
        .filter_map(|property| match property {
            RecordedProperty::Description { text } => Some(text.as_str()),
            _ => None,
        })
        .collect();
    if !descriptions.is_empty() {
        properties.push(Property::text(
            PropertyKind::Description.property_name(),
            descriptions.join("\n"),
        ));
    }

    for kind in [PropertyKind::Summary, PropertyKind::Key, PropertyKind::Id] {
        let value = recorded
            .iter()
            .filter(|property| property.kind() == kind)
            .find_map(RecordedProperty::single_value);
        if let Some(value) = value {
            properties.push(Property::value(kind.property_name(), value));
        }
    }

    Ok(properties)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    #[test]
    fn evidence_is_base64_encoded() {
        let mut recorder = PropertyRecorder::new();
        recorder.record_evidence([("file1.txt", "My file content is text".as_bytes())]);

        assert_eq!(
            recorder.properties(),
            [RecordedProperty::Evidence {
                name: "file1.txt".to_owned(),
                content_base64: "TXkgZmlsZSBjb250ZW50IGlzIHRleHQ=".to_owned(),
            }]
        );
    }

    #[test]
    fn properties_in_fixed_order() {
        let mut recorder = PropertyRecorder::new();
        recorder
            .record_id("12345")
            .record_description("line 1")
            .record_key("JIRA-1234")
            .record_evidence([("a.txt", b"a".to_vec()), ("b.log", b"bb".to_vec())])
            .record_summary("This is my test summary")
            .record_description("line 2");

        let properties =
            to_junit_properties(recorder.properties()).expect("properties are valid");
        assert_eq!(
            properties,
            vec![
                Property::items(
                    "testrun_evidence",
                    [PropertyItem::new("a.txt", "YQ=="), PropertyItem::new("b.log", "YmI=")],
                ),
                Property::text("test_description", "line 1\nline 2"),
                Property::value("test_summary", "This is my test summary"),
                Property::value("test_key", "JIRA-1234"),
                Property::value("test_id", "12345"),
            ]
        );
    }

    #[test]
    fn empty_recorder_produces_no_properties() {
        let properties =
            to_junit_properties(PropertyRecorder::new().properties()).expect("no properties");
        assert!(properties.is_empty());
    }

    #[test_case(PropertyKind::Summary ; "summary")]
    #[test_case(PropertyKind::Key ; "key")]
    #[test_case(PropertyKind::Id ; "id")]
    fn single_valued_kinds_reject_duplicates(kind: PropertyKind) {
        let mut recorder = PropertyRecorder::new();
        for value in ["first", "second"] {
            match kind {
                PropertyKind::Summary => recorder.record_summary(value),
                PropertyKind::Key => recorder.record_key(value),
                PropertyKind::Id => recorder.record_id(value),
                PropertyKind::Evidence | PropertyKind::Description => {
                    unreachable!("only single-valued kinds are tested")
                }
            };
        }
        // Recording itself never fails: the error is produced when converting.
        assert_eq!(recorder.properties().len(), 2);

        let error = to_junit_properties(recorder.properties())
            .expect_err("duplicate single-valued property is an error");
        assert_eq!(error.kind(), kind);
        assert_eq!(error.count(), 2);
        assert_eq!(error.values(), ["first", "second"]);
        assert!(kind.is_single_valued());
    }

    #[test]
    fn recorded_property_json() {
        let property = RecordedProperty::evidence("out.bin", [0u8, 255]);
        let json = serde_json::to_string(&property).expect("serialized");
        assert_eq!(
            json,
            r#"{"kind":"evidence","name":"out.bin","content_base64":"AP8="}"#
        );

        let parsed: RecordedProperty =
            serde_json::from_str(r#"{"kind":"key","value":"JIRA-1234"}"#).expect("parsed");
        assert_eq!(
            parsed,
            RecordedProperty::Key {
                value: "JIRA-1234".to_owned()
            }
        );
    }
}
