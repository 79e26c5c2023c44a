// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use goldenfile::Mint;
use pretty_assertions::assert_eq;
use std::time::Duration;
use xray_junit::{
    Property, PropertyItem, TestCase, TestCaseError, TestCaseStatus, TestSuite, XmlElement,
};

#[test]
fn fixtures() {
    let mut mint = Mint::new("tests/fixtures");

    let f = mint
        .new_goldenfile("basic_report.xml")
        .expect("creating new goldenfile succeeds");

    let basic_report = basic_report();
    basic_report
        .serialize(f)
        .expect("serializing basic_report succeeds");
}

#[test]
fn serialized_report_reads_back() {
    let report = basic_report();
    let xml = report.to_string().expect("serializing basic_report succeeds");
    let root = xml.parse::<XmlElement>().expect("report is well-formed");

    assert_eq!(root.name, "test_suite");
    assert_eq!(
        root.attributes,
        [
            ("name", "pytest"),
            ("tests", "4"),
            ("time", "42.235"),
            ("hostname", "ci-runner-01"),
            ("failures", "1"),
            ("skipped", "1"),
            ("errors", "1"),
        ]
        .map(|(k, v)| (k.to_owned(), v.to_owned()))
    );

    let testcases = root.find_all("testcase");
    assert_eq!(testcases.len(), report.test_cases.len());
    for (element, test_case) in testcases.iter().zip(&report.test_cases) {
        assert_eq!(element.attr("name"), Some(test_case.name.as_str()));
        assert_eq!(element.attr("classname"), Some(""));
    }

    let evidence = root
        .child_with_name_attr("testcase", "test_record_pass")
        .and_then(|tc| tc.child("properties"))
        .and_then(|props| props.child_with_name_attr("property", "testrun_evidence"))
        .and_then(|prop| prop.child_with_name_attr("item", "file1.txt"))
        .expect("evidence item is present");
    assert_eq!(evidence.text(), "TXkgZmlsZSBjb250ZW50IGlzIHRleHQ=");

    let description = root
        .find_all("testcase/properties/property")
        .into_iter()
        .find(|prop| prop.attr("name") == Some("test_description"))
        .expect("description is present");
    assert_eq!(description.text(), "line 1\nline 2");

    let failures = root.find_all("testcase/failure");
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].text(), "assert 1 == 2 & <more>");
}

fn basic_report() -> TestSuite {
    let mut suite = TestSuite::new("pytest");
    suite
        .set_time(Duration::new(42, 234_567_890))
        .set_hostname("ci-runner-01");

    let mut testcase = TestCase::new("test_record_pass");
    testcase
        .set_file("tests/test_basic.py")
        .set_line(3)
        .set_duration(Duration::from_millis(500))
        .add_property(Property::items(
            "testrun_evidence",
            [PropertyItem::new(
                "file1.txt",
                "TXkgZmlsZSBjb250ZW50IGlzIHRleHQ=",
            )],
        ))
        .add_property(Property::text("test_description", "line 1\nline 2"))
        .add_property(Property::value("test_summary", "This is my test summary"))
        .set_system_out("testcase0-output");
    suite.add_test_case(testcase);

    let mut testcase = TestCase::new("test_fail");
    testcase
        .set_file("tests/test_basic.py")
        .set_line(14)
        .set_duration(Duration::from_millis(4250))
        .set_status(TestCaseStatus::failure("assert 1 == 2 & <more>"))
        .set_system_err("some sort of failure output");
    suite.add_test_case(testcase);

    let mut testcase = TestCase::new("test_setup_error");
    testcase
        .set_file("tests/test_basic.py")
        .set_line(20)
        .set_duration(Duration::from_millis(125))
        .add_error(TestCaseError::new(
            "error during setup: ValueError: Intentional error during setup",
        ));
    suite.add_test_case(testcase);

    // No duration, to test that.
    let mut testcase = TestCase::new("test_skipped");
    testcase
        .set_file("tests/test_basic.py")
        .set_line(26)
        .set_status(TestCaseStatus::skipped("Skipped: not today"));
    suite.add_test_case(testcase);

    suite.update_counts();
    suite
}
