// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Read a report back into a generic element tree.

use crate::errors::ReadError;
use quick_xml::{
    Reader,
    events::{BytesStart, Event},
};
use std::{io::BufRead, str::FromStr};

/// An element read back from an XML document.
///
/// This is deliberately untyped: it preserves element names, attributes (in document order) and
/// text exactly as they appear in the document, which makes it suitable for checking what a
/// report contains.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct XmlElement {
    /// The element name.
    pub name: String,

    /// The attributes of the element, in document order.
    pub attributes: Vec<(String, String)>,

    /// The child elements, in document order.
    pub children: Vec<XmlElement>,

    /// The text content of the element.
    ///
    /// For elements that have child elements, whitespace-only text between them is not recorded.
    pub text: Option<String>,
}

impl XmlElement {
    /// Reads the root element of a document.
    pub fn from_reader(reader: impl BufRead) -> Result<Self, ReadError> {
        let mut reader = Reader::from_reader(reader);
        let mut buf = Vec::new();
        let mut stack: Vec<XmlElement> = Vec::new();
        let mut root = None;

        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Start(start) => {
                    stack.push(Self::from_start(&reader, &start)?);
                }
                Event::Empty(start) => {
                    let element = Self::from_start(&reader, &start)?;
                    Self::close(element, &mut stack, &mut root);
                }
                Event::End(_) => {
                    // quick-xml checks that end tags match their start tags.
                    if let Some(mut element) = stack.pop() {
                        if !element.children.is_empty()
                            && element.text.as_deref().is_some_and(|t| t.trim().is_empty())
                        {
                            element.text = None;
                        }
                        Self::close(element, &mut stack, &mut root);
                    }
                }
                Event::Text(text) => {
                    if let Some(current) = stack.last_mut() {
                        let text = text.unescape()?;
                        current.text.get_or_insert_with(String::new).push_str(&text);
                    }
                }
                Event::CData(data) => {
                    if let Some(current) = stack.last_mut() {
                        let data = reader.decoder().decode(&data)?;
                        current.text.get_or_insert_with(String::new).push_str(&data);
                    }
                }
                Event::Eof => break,
                Event::Decl(_) | Event::PI(_) | Event::DocType(_) | Event::Comment(_) => {}
            }
            buf.clear();
        }

        if let Some(element) = stack.pop() {
            return Err(ReadError::UnclosedElement { name: element.name });
        }
        root.ok_or(ReadError::NoRootElement)
    }

    /// Returns the value of the given attribute.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Returns the text content, or `""` if there is none.
    pub fn text(&self) -> &str {
        self.text.as_deref().unwrap_or_default()
    }

    /// Returns the first child with the given name.
    pub fn child(&self, name: &str) -> Option<&XmlElement> {
        self.children.iter().find(|child| child.name == name)
    }

    /// Returns all children with the given name.
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a XmlElement> {
        self.children.iter().filter(move |child| child.name == name)
    }

    /// Returns the first child with the given name whose `name` attribute equals `attr_name`.
    ///
    /// This is the equivalent of the XPath step `name[@name='attr_name']`.
    pub fn child_with_name_attr<'a>(
        &'a self,
        name: &'a str,
        attr_name: &str,
    ) -> Option<&'a XmlElement> {
        self.children_named(name)
            .find(move |child| child.attr("name") == Some(attr_name))
    }

    /// Returns every element reachable by following the given `/`-separated path of child names.
    ///
    /// `suite.find_all("testcase/failure")` returns the `failure` elements of all test cases.
    pub fn find_all<'a>(&'a self, path: &str) -> Vec<&'a XmlElement> {
        let mut current = vec![self];
        for step in path.split('/').filter(|step| !step.is_empty()) {
            current = current
                .into_iter()
                .flat_map(|element| element.children.iter().filter(move |c| c.name == step))
                .collect();
        }
        current
    }

    fn from_start<R>(reader: &Reader<R>, start: &BytesStart<'_>) -> Result<Self, ReadError> {
        let decoder = reader.decoder();
        let name = decoder.decode(start.name().as_ref())?.into_owned();
        let mut attributes = Vec::new();
        for attr in start.attributes() {
            let attr = attr.map_err(quick_xml::Error::from)?;
            let key = decoder.decode(attr.key.as_ref())?.into_owned();
            let value = attr.unescape_value()?.into_owned();
            attributes.push((key, value));
        }

        Ok(Self {
            name,
            attributes,
            children: Vec::new(),
            text: None,
        })
    }

    fn close(element: XmlElement, stack: &mut [XmlElement], root: &mut Option<XmlElement>) {
        match stack.last_mut() {
            Some(parent) => parent.children.push(element),
            None => {
                if root.is_none() {
                    *root = Some(element);
                }
            }
        }
    }
}

impl FromStr for XmlElement {
    type Err = ReadError;

    fn from_str(xml: &str) -> Result<Self, Self::Err> {
        Self::from_reader(xml.as_bytes())
    }
}
