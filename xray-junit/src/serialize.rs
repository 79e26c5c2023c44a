// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Serialize a `TestSuite`.

use crate::{
    Property, PropertyContent, PropertyItem, TestCase, TestCaseError, TestCaseStatus, TestSuite,
    XmlString,
};
use quick_xml::{
    Writer,
    escape::escape,
    events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event, attributes::Attribute},
    name::QName,
};
use std::{borrow::Cow, io, time::Duration};

pub(crate) static TEST_SUITE_TAG: &str = "test_suite";
pub(crate) static TESTCASE_TAG: &str = "testcase";
pub(crate) static PROPERTIES_TAG: &str = "properties";
pub(crate) static PROPERTY_TAG: &str = "property";
pub(crate) static ITEM_TAG: &str = "item";
pub(crate) static FAILURE_TAG: &str = "failure";
pub(crate) static ERROR_TAG: &str = "error";
pub(crate) static SKIPPED_TAG: &str = "skipped";
pub(crate) static SYSTEM_OUT_TAG: &str = "system-out";
pub(crate) static SYSTEM_ERR_TAG: &str = "system-err";

pub(crate) fn serialize_suite(suite: &TestSuite, writer: impl io::Write) -> quick_xml::Result<()> {
    let mut writer = Writer::new_with_indent(writer, b' ', 4);

    let decl = BytesDecl::new("1.0", Some("UTF-8"), None);
    writer.write_event(Event::Decl(decl))?;

    serialize_suite_impl(suite, &mut writer)?;

    // Add a trailing newline.
    writer.write_indent()
}

fn serialize_suite_impl(
    suite: &TestSuite,
    writer: &mut Writer<impl io::Write>,
) -> quick_xml::Result<()> {
    // Use the destructuring syntax to ensure that all fields are handled.
    let TestSuite {
        name,
        tests,
        failures,
        skipped,
        errors,
        time,
        hostname,
        test_cases,
    } = suite;

    let mut suite_tag = BytesStart::new(TEST_SUITE_TAG);
    push_attribute(&mut suite_tag, "name", name.as_str());
    suite_tag.push_attribute(("tests", tests.to_string().as_str()));
    if let Some(time) = time {
        suite_tag.push_attribute(("time", serialize_time(time).as_str()));
    }
    if let Some(hostname) = hostname {
        push_attribute(&mut suite_tag, "hostname", hostname.as_str());
    }
    suite_tag.push_attribute(("failures", failures.to_string().as_str()));
    suite_tag.push_attribute(("skipped", skipped.to_string().as_str()));
    suite_tag.push_attribute(("errors", errors.to_string().as_str()));

    if test_cases.is_empty() {
        writer.write_event(Event::Empty(suite_tag))?;
    } else {
        writer.write_event(Event::Start(suite_tag))?;
        for test_case in test_cases {
            serialize_test_case(test_case, writer)?;
        }
        serialize_end_tag(TEST_SUITE_TAG, writer)?;
    }

    writer.write_event(Event::Eof)
}

fn serialize_test_case(
    test_case: &TestCase,
    writer: &mut Writer<impl io::Write>,
) -> quick_xml::Result<()> {
    let TestCase {
        name,
        classname,
        file,
        line,
        duration,
        status,
        errors,
        properties,
        system_out,
        system_err,
    } = test_case;

    let mut testcase_tag = BytesStart::new(TESTCASE_TAG);
    push_attribute(&mut testcase_tag, "classname", classname.as_str());
    push_attribute(&mut testcase_tag, "name", name.as_str());
    if let Some(file) = file {
        push_attribute(&mut testcase_tag, "file", file.as_str());
    }
    if let Some(line) = line {
        testcase_tag.push_attribute(("line", line.to_string().as_str()));
    }
    if let Some(duration) = duration {
        testcase_tag.push_attribute(("duration", serialize_duration(duration).as_str()));
    }

    let is_empty = properties.is_empty()
        && status.is_success()
        && errors.is_empty()
        && system_out.is_none()
        && system_err.is_none();
    if is_empty {
        return writer.write_event(Event::Empty(testcase_tag));
    }

    writer.write_event(Event::Start(testcase_tag))?;

    if !properties.is_empty() {
        serialize_empty_start_tag(PROPERTIES_TAG, writer)?;
        for property in properties {
            serialize_property(property, writer)?;
        }
        serialize_end_tag(PROPERTIES_TAG, writer)?;
    }

    match status {
        TestCaseStatus::Success => {}
        TestCaseStatus::Failure { description } => {
            serialize_status(None, description.as_ref(), FAILURE_TAG, writer)?;
        }
        TestCaseStatus::Skipped { message } => {
            serialize_status(message.as_ref(), None, SKIPPED_TAG, writer)?;
        }
    }

    for TestCaseError { message } in errors {
        serialize_status(Some(message), None, ERROR_TAG, writer)?;
    }

    if let Some(system_out) = system_out {
        serialize_text_element(SYSTEM_OUT_TAG, &[], system_out, writer)?;
    }
    if let Some(system_err) = system_err {
        serialize_text_element(SYSTEM_ERR_TAG, &[], system_err, writer)?;
    }

    serialize_end_tag(TESTCASE_TAG, writer)
}

fn serialize_property(
    property: &Property,
    writer: &mut Writer<impl io::Write>,
) -> quick_xml::Result<()> {
    let Property { name, content } = property;

    match content {
        PropertyContent::Value(value) => {
            let mut property_tag = BytesStart::new(PROPERTY_TAG);
            push_attribute(&mut property_tag, "name", name.as_str());
            push_attribute(&mut property_tag, "value", value.as_str());
            writer.write_event(Event::Empty(property_tag))
        }
        PropertyContent::Text(text) => {
            serialize_text_element(PROPERTY_TAG, &[("name", name)], text, writer)
        }
        PropertyContent::Items(items) => {
            let mut property_tag = BytesStart::new(PROPERTY_TAG);
            push_attribute(&mut property_tag, "name", name.as_str());
            if items.is_empty() {
                return writer.write_event(Event::Empty(property_tag));
            }

            writer.write_event(Event::Start(property_tag))?;
            for PropertyItem { name, text } in items {
                serialize_text_element(ITEM_TAG, &[("name", name)], text, writer)?;
            }
            serialize_end_tag(PROPERTY_TAG, writer)
        }
    }
}

fn serialize_status(
    message: Option<&XmlString>,
    description: Option<&XmlString>,
    tag_name: &'static str,
    writer: &mut Writer<impl io::Write>,
) -> quick_xml::Result<()> {
    let mut tag = BytesStart::new(tag_name);
    if let Some(message) = message {
        push_attribute(&mut tag, "message", message.as_str());
    }

    match description {
        Some(description) => {
            writer.write_event(Event::Start(tag))?;
            writer.write_event(Event::Text(BytesText::new(description.as_str())))?;
            serialize_end_tag(tag_name, writer)
        }
        None => writer.write_event(Event::Empty(tag)),
    }
}

// Writes `<tag attrs..>text</tag>`, keeping the text on the same line as the tags so that no
// indentation leaks into it.
fn serialize_text_element(
    tag_name: &'static str,
    attributes: &[(&str, &XmlString)],
    text: &XmlString,
    writer: &mut Writer<impl io::Write>,
) -> quick_xml::Result<()> {
    let mut tag = BytesStart::new(tag_name);
    for (key, value) in attributes {
        push_attribute(&mut tag, *key, value.as_str());
    }

    if text.is_empty() {
        return writer.write_event(Event::Empty(tag));
    }

    writer.write_event(Event::Start(tag))?;
    writer.write_event(Event::Text(BytesText::new(text.as_str())))?;
    serialize_end_tag(tag_name, writer)
}

fn serialize_empty_start_tag(
    tag_name: &'static str,
    writer: &mut Writer<impl io::Write>,
) -> quick_xml::Result<()> {
    let tag = BytesStart::new(tag_name);
    writer.write_event(Event::Start(tag))
}

fn serialize_end_tag(
    tag_name: &'static str,
    writer: &mut Writer<impl io::Write>,
) -> quick_xml::Result<()> {
    let end_tag = BytesEnd::new(tag_name);
    writer.write_event(Event::End(end_tag))
}

// Attribute values are escaped here rather than by quick-xml, which leaves whitespace alone:
// parsers normalize a raw line break in an attribute to a space.
fn push_attribute(tag: &mut BytesStart<'_>, key: &str, value: &str) {
    let mut escaped = String::with_capacity(value.len());
    for c in escape(value).chars() {
        match c {
            '\n' => escaped.push_str("&#10;"),
            '\r' => escaped.push_str("&#13;"),
            '\t' => escaped.push_str("&#9;"),
            c => escaped.push(c),
        }
    }
    tag.push_attribute(Attribute {
        key: QName(key.as_bytes()),
        value: Cow::Owned(escaped.into_bytes()),
    });
}

// Serialize time as seconds with 3 decimal points.
fn serialize_time(time: &Duration) -> String {
    format!("{:.3}", time.as_secs_f64())
}

// Test durations keep full precision: most tests take well under a millisecond.
fn serialize_duration(duration: &Duration) -> String {
    format!("{}", duration.as_secs_f64())
}
