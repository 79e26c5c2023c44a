// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::{errors::SerializeError, serialize::serialize_suite};
use std::{borrow::Borrow, fmt, io, ops::Deref, time::Duration};

/// The root element of a report: a single `test_suite`.
///
/// The aggregate counts are not maintained as test cases are added. Call
/// [`update_counts`](Self::update_counts) once the suite is complete to derive them from the test
/// cases it holds.
#[derive(Clone, Debug)]
pub struct TestSuite {
    /// The name of this suite.
    pub name: XmlString,

    /// The total number of test cases.
    pub tests: usize,

    /// The number of test cases carrying a `failure` element.
    pub failures: usize,

    /// The number of test cases carrying a `skipped` element.
    pub skipped: usize,

    /// The number of `error` elements across all test cases.
    ///
    /// A single test case can contribute more than one error, e.g. if both its setup and its
    /// teardown failed.
    pub errors: usize,

    /// The overall time taken by the suite.
    ///
    /// This is serialized as the number of seconds, with 3 decimal places.
    pub time: Option<Duration>,

    /// The host the suite ran on.
    pub hostname: Option<XmlString>,

    /// The test cases in this suite, in the order they were added.
    pub test_cases: Vec<TestCase>,
}

impl TestSuite {
    /// Creates a new, empty `TestSuite` with the given name.
    pub fn new(name: impl Into<XmlString>) -> Self {
        Self {
            name: name.into(),
            tests: 0,
            failures: 0,
            skipped: 0,
            errors: 0,
            time: None,
            hostname: None,
            test_cases: vec![],
        }
    }

    /// Sets the time taken by the suite.
    pub fn set_time(&mut self, time: Duration) -> &mut Self {
        self.time = Some(time);
        self
    }

    /// Sets the hostname.
    pub fn set_hostname(&mut self, hostname: impl Into<XmlString>) -> &mut Self {
        self.hostname = Some(hostname.into());
        self
    }

    /// Appends a test case, returning its index within the suite.
    pub fn add_test_case(&mut self, test_case: TestCase) -> usize {
        self.test_cases.push(test_case);
        self.test_cases.len() - 1
    }

    /// Recomputes `tests`, `failures`, `skipped` and `errors` by scanning the test cases.
    pub fn update_counts(&mut self) -> &mut Self {
        let mut failures = 0;
        let mut skipped = 0;
        let mut errors = 0;
        for test_case in &self.test_cases {
            match &test_case.status {
                TestCaseStatus::Success => {}
                TestCaseStatus::Failure { .. } => failures += 1,
                TestCaseStatus::Skipped { .. } => skipped += 1,
            }
            errors += test_case.errors.len();
        }

        self.tests = self.test_cases.len();
        self.failures = failures;
        self.skipped = skipped;
        self.errors = errors;
        self
    }

    /// Serialize this suite to the given writer.
    pub fn serialize(&self, writer: impl io::Write) -> Result<(), SerializeError> {
        serialize_suite(self, writer).map_err(SerializeError::from)
    }

    /// Serialize this suite to a string.
    pub fn to_string(&self) -> Result<String, SerializeError> {
        let mut buf: Vec<u8> = vec![];
        self.serialize(&mut buf)?;
        String::from_utf8(buf).map_err(|utf8_err| {
            quick_xml::Error::NonDecodable(Some(utf8_err.utf8_error())).into()
        })
    }
}

/// Represents a single test case.
#[derive(Clone, Debug)]
#[non_exhaustive]
pub struct TestCase {
    /// The fully qualified name of the test.
    pub name: XmlString,

    /// The "classname" of the test case.
    ///
    /// Xray derives the test key from the name alone, so this is empty unless set explicitly.
    pub classname: XmlString,

    /// The source file the test is defined in, with `/` separators.
    pub file: Option<XmlString>,

    /// The line the test is defined on.
    pub line: Option<u32>,

    /// The time it took to execute this test case.
    pub duration: Option<Duration>,

    /// The outcome of the test body.
    pub status: TestCaseStatus,

    /// Errors that occurred outside the test body, e.g. while setting it up or tearing it down.
    pub errors: Vec<TestCaseError>,

    /// Custom properties recorded while the test ran.
    ///
    /// Serialized inside a `properties` element, which is omitted if this is empty.
    pub properties: Vec<Property>,

    /// Captured output serialized as `system-out`.
    pub system_out: Option<XmlString>,

    /// Captured output serialized as `system-err`.
    pub system_err: Option<XmlString>,
}

impl TestCase {
    /// Creates a new, passing test case.
    pub fn new(name: impl Into<XmlString>) -> Self {
        Self {
            name: name.into(),
            classname: XmlString::default(),
            file: None,
            line: None,
            duration: None,
            status: TestCaseStatus::Success,
            errors: vec![],
            properties: vec![],
            system_out: None,
            system_err: None,
        }
    }

    /// Sets the source file of the test.
    pub fn set_file(&mut self, file: impl Into<XmlString>) -> &mut Self {
        self.file = Some(file.into());
        self
    }

    /// Sets the source line of the test.
    pub fn set_line(&mut self, line: u32) -> &mut Self {
        self.line = Some(line);
        self
    }

    /// Sets the time taken by the test.
    pub fn set_duration(&mut self, duration: Duration) -> &mut Self {
        self.duration = Some(duration);
        self
    }

    /// Sets the outcome of the test body.
    pub fn set_status(&mut self, status: TestCaseStatus) -> &mut Self {
        self.status = status;
        self
    }

    /// Adds an error that occurred outside the test body.
    pub fn add_error(&mut self, error: TestCaseError) -> &mut Self {
        self.errors.push(error);
        self
    }

    /// Adds a property.
    pub fn add_property(&mut self, property: impl Into<Property>) -> &mut Self {
        self.properties.push(property.into());
        self
    }

    /// Replaces all properties.
    pub fn set_properties(
        &mut self,
        properties: impl IntoIterator<Item = impl Into<Property>>,
    ) -> &mut Self {
        self.properties = properties.into_iter().map(Into::into).collect();
        self
    }

    /// Sets standard output.
    pub fn set_system_out(&mut self, system_out: impl Into<XmlString>) -> &mut Self {
        self.system_out = Some(system_out.into());
        self
    }

    /// Sets standard error.
    pub fn set_system_err(&mut self, system_err: impl Into<XmlString>) -> &mut Self {
        self.system_err = Some(system_err.into());
        self
    }
}

/// The outcome of a test body.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum TestCaseStatus {
    /// The test passed. No element is emitted.
    Success,

    /// The test failed. Serialized as a `failure` element.
    Failure {
        /// The long failure representation.
        ///
        /// This is serialized as the text node of the element.
        description: Option<XmlString>,
    },

    /// The test was skipped. Serialized as a `skipped` element.
    Skipped {
        /// The skip message, serialized as the `message` attribute.
        message: Option<XmlString>,
    },
}

impl TestCaseStatus {
    /// Creates a new `TestCaseStatus` that represents a failed test.
    pub fn failure(description: impl Into<XmlString>) -> Self {
        TestCaseStatus::Failure {
            description: Some(description.into()),
        }
    }

    /// Creates a new `TestCaseStatus` that represents a skipped test.
    pub fn skipped(message: impl Into<XmlString>) -> Self {
        TestCaseStatus::Skipped {
            message: Some(message.into()),
        }
    }

    /// Returns true if this is a success.
    pub fn is_success(&self) -> bool {
        matches!(self, TestCaseStatus::Success)
    }
}

/// An error outside the test body. Serialized as an `error` element.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TestCaseError {
    /// The error message, serialized as the `message` attribute.
    pub message: XmlString,
}

impl TestCaseError {
    /// Creates a new `TestCaseError`.
    pub fn new(message: impl Into<XmlString>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// A custom property attached to a test case.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Property {
    /// The name of the property.
    pub name: XmlString,

    /// The content of the property.
    pub content: PropertyContent,
}

impl Property {
    /// Creates a property with a `value` attribute.
    pub fn value(name: impl Into<XmlString>, value: impl Into<XmlString>) -> Self {
        Self {
            name: name.into(),
            content: PropertyContent::Value(value.into()),
        }
    }

    /// Creates a property with a text node.
    pub fn text(name: impl Into<XmlString>, text: impl Into<XmlString>) -> Self {
        Self {
            name: name.into(),
            content: PropertyContent::Text(text.into()),
        }
    }

    /// Creates a property holding `item` children.
    pub fn items(name: impl Into<XmlString>, items: impl IntoIterator<Item = PropertyItem>) -> Self {
        Self {
            name: name.into(),
            content: PropertyContent::Items(items.into_iter().collect()),
        }
    }
}

/// The content of a [`Property`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum PropertyContent {
    /// Serialized as `<property name=".." value=".."/>`.
    Value(XmlString),

    /// Serialized as `<property name="..">text</property>`.
    Text(XmlString),

    /// Serialized as `<property name=".."><item name="..">text</item>..</property>`.
    Items(Vec<PropertyItem>),
}

/// A named item within a [`Property`], e.g. one evidence attachment.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PropertyItem {
    /// The name of the item.
    pub name: XmlString,

    /// The text content of the item.
    pub text: XmlString,
}

impl PropertyItem {
    /// Creates a new `PropertyItem`.
    pub fn new(name: impl Into<XmlString>, text: impl Into<XmlString>) -> Self {
        Self {
            name: name.into(),
            text: text.into(),
        }
    }
}

/// A string that can be safely written out as XML 1.0.
///
/// ANSI escape sequences are stripped, as are characters that XML 1.0 does not allow (C0 control
/// characters other than tab, line feed and carriage return, and the noncharacters U+FFFE and
/// U+FFFF). Markup characters are left alone:
/// those are escaped by the serializer.
#[derive(Clone, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct XmlString {
    data: Box<str>,
}

impl XmlString {
    /// Creates a new `XmlString`, removing any characters that cannot be represented.
    pub fn new(data: impl AsRef<str>) -> Self {
        let data = strip_ansi_escapes::strip_str(data.as_ref());
        let data = data
            .replace(
                |c| {
                    matches!(
                        c,
                        '\x00'..='\x08'
                            | '\x0b'
                            | '\x0c'
                            | '\x0e'..='\x1f'
                            | '\u{fffe}'
                            | '\u{ffff}'
                    )
                },
                "",
            )
            .into_boxed_str();
        Self { data }
    }

    /// Returns the string.
    pub fn as_str(&self) -> &str {
        &self.data
    }

    /// Converts this into a `String`.
    pub fn into_string(self) -> String {
        self.data.into_string()
    }
}

impl<T: AsRef<str>> From<T> for XmlString {
    fn from(s: T) -> Self {
        XmlString::new(s)
    }
}

impl From<XmlString> for String {
    fn from(s: XmlString) -> Self {
        s.into_string()
    }
}

impl Deref for XmlString {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.data
    }
}

impl Borrow<str> for XmlString {
    fn borrow(&self) -> &str {
        &self.data
    }
}

impl PartialEq<str> for XmlString {
    fn eq(&self, other: &str) -> bool {
        &*self.data == other
    }
}

impl PartialEq<&str> for XmlString {
    fn eq(&self, other: &&str) -> bool {
        &*self.data == *other
    }
}

impl fmt::Debug for XmlString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.data, f)
    }
}

impl fmt::Display for XmlString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.data, f)
    }
}
