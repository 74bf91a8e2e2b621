use prism_chat::error::ArtifactParseError;
use prism_chat::extract::{FENCE_OPEN, FenceScanner, extract};
use prism_core::models::artifact::ArtifactKind;

const KPI_BODY: &str =
    r#"{"type":"kpi","title":"Growth","data":{"metrics":[{"label":"Revenue","value":"12%"}]}}"#;

const TICKS_BODY: &str =
    r#"{"type":"kpi","title":"Use ``` fences","data":{"note":"wrap code in ```"}}"#;

fn fenced(body: &str) -> String {
    format!("```json-widget\n{body}\n```")
}

#[test]
fn kpi_split_across_fragments() {
    let mut scanner = FenceScanner::new();
    scanner.push("Here is the ");
    scanner.push(&format!("data:\n{}", fenced(KPI_BODY)));

    let extraction = scanner.extraction();
    assert_eq!(extraction.clean_text, "Here is the data:");

    let artifact = extraction.artifact.expect("artifact");
    assert_eq!(artifact.kind, ArtifactKind::Kpi);
    assert_eq!(artifact.title, "Growth");
    assert_eq!(artifact.data["metrics"][0]["label"], "Revenue");
    assert!(extraction.parse_error.is_none());
}

#[test]
fn complete_fence_leaves_no_marker_or_json() {
    let buffer = format!("Before.\n{}\nAfter.", fenced(KPI_BODY));
    let extraction = extract(&buffer);

    assert!(!extraction.clean_text.contains("```"));
    assert!(!extraction.clean_text.contains("json-widget"));
    assert!(!extraction.clean_text.contains("\"type\""));
    assert_eq!(extraction.clean_text, "Before.\n\nAfter.");
    assert_eq!(extraction.artifact.map(|a| a.kind), Some(ArtifactKind::Kpi));
}

#[test]
fn unterminated_fence_stays_visible() {
    let buffer = "Loading chart:\n```json-widget\n{\"type\":\"chart\",\"title\":\"Sa";
    let extraction = extract(buffer);

    assert!(extraction.artifact.is_none());
    assert!(extraction.parse_error.is_none());
    assert!(extraction.clean_text.contains(FENCE_OPEN));
    assert_eq!(extraction.clean_text, buffer);
}

#[test]
fn malformed_json_removes_fence_without_artifact() {
    let buffer = format!("Oops:\n{}", fenced(r#"{"type":"kpi","title":"Growth","data":{"#));
    let extraction = extract(&buffer);

    assert_eq!(extraction.clean_text, "Oops:");
    assert!(extraction.artifact.is_none());
    assert!(matches!(
        extraction.parse_error,
        Some(ArtifactParseError::InvalidJson(_))
    ));
}

#[test]
fn unknown_kind_is_a_shape_error() {
    let buffer = fenced(r#"{"type":"table","title":"T","data":{}}"#);
    let extraction = extract(&buffer);

    assert!(extraction.artifact.is_none());
    assert!(matches!(
        extraction.parse_error,
        Some(ArtifactParseError::InvalidShape(_))
    ));
    assert_eq!(extraction.clean_text, "");
}

#[test]
fn non_object_data_is_a_shape_error() {
    let extraction = extract(&fenced(r#"{"type":"chart","title":"T","data":[1,2]}"#));
    assert!(matches!(
        extraction.parse_error,
        Some(ArtifactParseError::InvalidShape(_))
    ));
}

#[test]
fn last_complete_fence_wins() {
    let chart = r#"{"type":"chart","title":"Sales","data":{"series":[]}}"#;
    let buffer = format!("One {}\ntwo {}\nthree", fenced(chart), fenced(KPI_BODY));
    let extraction = extract(&buffer);

    let artifact = extraction.artifact.expect("artifact");
    assert_eq!(artifact.kind, ArtifactKind::Kpi);
    assert_eq!(extraction.clean_text, "One \ntwo \nthree");
}

#[test]
fn malformed_last_fence_clears_artifact() {
    let buffer = format!("{}\nthen {}", fenced(KPI_BODY), fenced("not json"));
    let extraction = extract(&buffer);

    assert!(extraction.artifact.is_none());
    assert!(extraction.parse_error.is_some());
    assert_eq!(extraction.clean_text, "then");
}

#[test]
fn backticks_inside_json_do_not_close_fence() {
    let buffer = format!("Intro\n{}", fenced(TICKS_BODY));
    let extraction = extract(&buffer);

    assert_eq!(extraction.clean_text, "Intro");
    let artifact = extraction.artifact.expect("artifact");
    assert_eq!(artifact.title, "Use ``` fences");
    assert_eq!(artifact.data["note"], "wrap code in ```");
}

#[test]
fn closing_marker_must_be_alone_on_its_line() {
    let open = "```json-widget\n{\"type\":\"kpi\",\"title\":\"K\",\"data\":{}} ```\n```done\n";
    let extraction = extract(open);
    assert_eq!(extraction.clean_text, open);
    assert!(extraction.artifact.is_none());

    let closed = format!("{open}```  \r\nAfter");
    let extraction = extract(&closed);
    assert_eq!(extraction.clean_text, "After");
    assert!(matches!(
        extraction.parse_error,
        Some(ArtifactParseError::InvalidJson(_))
    ));
}

#[test]
fn closing_marker_at_buffer_end_is_provisional() {
    let mut scanner = FenceScanner::new();
    scanner.push(&fenced(KPI_BODY));
    assert!(!scanner.in_fence());
    assert!(scanner.extraction().artifact.is_some());

    // More text on the marker's line means it was not a closing line.
    scanner.push("x");
    assert!(scanner.in_fence());
    assert!(scanner.extraction().artifact.is_none());
    assert_eq!(scanner.extraction(), extract(scanner.buffer()));

    scanner.push("\n```\nDone.");
    let extraction = scanner.extraction();
    assert_eq!(extraction.clean_text, "Done.");
    assert!(extraction.parse_error.is_some());
}

#[test]
fn text_without_fences_is_untouched() {
    let extraction = extract("  plain reply with ``` inline ticks  ");
    assert_eq!(extraction.clean_text, "  plain reply with ``` inline ticks  ");
    assert!(extraction.artifact.is_none());
    assert!(extraction.parse_error.is_none());
}

#[test]
fn extract_is_idempotent() {
    let buffer = format!("Intro {} outro", fenced(KPI_BODY));
    assert_eq!(extract(&buffer), extract(&buffer));

    let mut scanner = FenceScanner::new();
    scanner.push(&buffer);
    assert_eq!(scanner.extraction(), scanner.extraction());
}

fn boundaries(s: &str) -> Vec<usize> {
    (0..=s.len()).filter(|&i| s.is_char_boundary(i)).collect()
}

#[test]
fn chunked_scan_matches_whole_buffer_at_every_split() {
    let buffer = format!("Überblick → {} Ende ✓", fenced(KPI_BODY));
    let expected = extract(&buffer);

    for &i in &boundaries(&buffer) {
        let mut scanner = FenceScanner::new();
        scanner.push(&buffer[..i]);
        scanner.push(&buffer[i..]);
        assert_eq!(scanner.extraction(), expected, "split at {i}");
    }
}

#[test]
fn chunked_scan_matches_whole_buffer_at_every_double_split() {
    let buffer = format!(
        "a {}\nb {}",
        fenced(r#"{"type":"kpi","title":"Use ``` fences","data":{}}"#),
        fenced("{")
    );
    let expected = extract(&buffer);
    let cuts = boundaries(&buffer);

    for &i in &cuts {
        for &j in cuts.iter().filter(|&&j| j >= i) {
            let mut scanner = FenceScanner::new();
            scanner.push(&buffer[..i]);
            scanner.push(&buffer[i..j]);
            scanner.push(&buffer[j..]);
            assert_eq!(scanner.extraction(), expected, "splits at {i}, {j}");
        }
    }
}

#[test]
fn chunked_scan_with_backticks_in_body_matches_whole_buffer() {
    let buffer = format!("Intro\n{}\nOutro", fenced(TICKS_BODY));
    let expected = extract(&buffer);
    assert_eq!(expected.clean_text, "Intro\n\nOutro");

    for &i in &boundaries(&buffer) {
        let mut scanner = FenceScanner::new();
        scanner.push(&buffer[..i]);
        scanner.push(&buffer[i..]);
        assert_eq!(scanner.extraction(), expected, "split at {i}");
    }
}

#[test]
fn byte_at_a_time_matches_every_prefix() {
    let buffers = [
        format!("Result:\n{}\nDone.", fenced(KPI_BODY)),
        format!("Result:\n{}\nDone.", fenced(TICKS_BODY)),
        "```json-widget\n{}\n```nope\n```\nDone.".to_string(),
    ];

    for buffer in &buffers {
        let mut scanner = FenceScanner::new();
        for (i, c) in buffer.char_indices() {
            scanner.push(&c.to_string());
            let end = i + c.len_utf8();
            assert_eq!(scanner.extraction(), extract(&buffer[..end]), "prefix {end}");
        }
    }
}

#[test]
fn artifact_is_stable_once_fence_closes() {
    let buffer = format!("Numbers:\n{}\nThat is all for today.", fenced(KPI_BODY));
    let close_end = buffer.find("\n```\n").map(|p| p + 4).expect("close");
    let expected = extract(&buffer).artifact;
    assert!(expected.is_some());

    for &end in boundaries(&buffer).iter().filter(|&&e| e >= close_end) {
        assert_eq!(extract(&buffer[..end]).artifact, expected, "prefix {end}");
    }
    for &end in boundaries(&buffer).iter().filter(|&&e| e < close_end) {
        assert!(extract(&buffer[..end]).artifact.is_none(), "prefix {end}");
    }
}

#[test]
fn scanner_reports_open_fence() {
    let mut scanner = FenceScanner::new();
    scanner.push("chart: ```json-");
    assert!(!scanner.in_fence());
    scanner.push("widget\n{");
    assert!(scanner.in_fence());
    scanner.push("}\n``");
    assert!(scanner.in_fence());
    scanner.push("`");
    assert!(!scanner.in_fence());
    assert_eq!(scanner.buffer(), "chart: ```json-widget\n{}\n```");
}
