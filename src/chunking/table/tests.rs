use super::*;

const DROPS_TABLE: &str = "| Item | Chance |\n| --- | --- |\n| Leather | 50% |\n| Beef | 100% |";

#[test]
fn prose_only_content_is_one_segment() {
    let segments = segment_content("Just some prose.\n\nMore prose.");

    assert_eq!(
        segments,
        vec![ContentSegment::Prose(
            "Just some prose.\n\nMore prose.".to_string()
        )]
    );
}

#[test]
fn table_between_prose_keeps_document_order() {
    let content = format!("Before.\n\n{DROPS_TABLE}\n\nAfter.");
    let segments = segment_content(&content);

    assert_eq!(segments.len(), 3);
    assert_eq!(segments[0], ContentSegment::Prose("Before.".to_string()));
    assert_eq!(
        segments[1],
        ContentSegment::Table(DROPS_TABLE.to_string())
    );
    assert_eq!(segments[2], ContentSegment::Prose("After.".to_string()));
}

#[test]
fn pipe_row_without_delimiter_is_prose() {
    let segments = segment_content("| not a table, just a stray pipe row |\nRegular line.");

    assert_eq!(segments.len(), 1);
    assert!(matches!(segments[0], ContentSegment::Prose(_)));
}

#[test]
fn table_at_end_of_content_is_flushed() {
    let content = format!("Intro.\n\n{DROPS_TABLE}");
    let segments = segment_content(&content);

    assert_eq!(segments.len(), 2);
    assert_eq!(
        segments[1],
        ContentSegment::Table(DROPS_TABLE.to_string())
    );
}

#[test]
fn multiple_tables_become_separate_segments() {
    let content = format!("{DROPS_TABLE}\n\n{DROPS_TABLE}");
    let segments = segment_content(&content);

    let tables = segments
        .iter()
        .filter(|s| matches!(s, ContentSegment::Table(_)))
        .count();
    assert_eq!(tables, 2);
}

#[test]
fn small_table_is_one_batch() {
    let batches = split_table(DROPS_TABLE, 1000);

    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0], DROPS_TABLE);
}

#[test]
fn row_batches_duplicate_header_rows() {
    let rows: Vec<String> = (0..30)
        .map(|i| format!("| Item {i} | {}% |", i * 3))
        .collect();
    let table = format!("| Item | Chance |\n| --- | --- |\n{}", rows.join("\n"));

    let batches = split_table(&table, 100);

    assert!(batches.len() > 1);
    for batch in &batches {
        let mut lines = batch.lines();
        assert_eq!(lines.next(), Some("| Item | Chance |"));
        assert_eq!(lines.next(), Some("| --- | --- |"));
        assert!(lines.next().is_some());
    }

    // Every body row survives, exactly once, in original order
    let combined: Vec<&str> = batches
        .iter()
        .flat_map(|b| b.lines().skip(2))
        .collect();
    assert_eq!(combined, rows.iter().map(String::as_str).collect::<Vec<_>>());
}

#[test]
fn batch_content_respects_bound() {
    let rows: Vec<String> = (0..20).map(|i| format!("| Row {i} | value |")).collect();
    let table = format!("| A | B |\n| - | - |\n{}", rows.join("\n"));

    let batches = split_table(&table, 60);

    for batch in &batches {
        let content_len: usize = batch
            .lines()
            .skip(2)
            .map(|l| l.chars().count() + 1)
            .sum();
        assert!(content_len <= 60, "batch content of {content_len} chars");
    }
}

#[test]
fn oversized_single_row_is_emitted_whole() {
    let long_row = format!("| {} | x |", "y".repeat(200));
    let table = format!("| A | B |\n| - | - |\n{long_row}");

    let batches = split_table(&table, 50);

    assert_eq!(batches.len(), 1);
    assert!(batches[0].contains(&long_row));
}

#[test]
fn headerless_lines_return_single_chunk() {
    let batches = split_table("| lonely row |", 10);
    assert_eq!(batches, vec!["| lonely row |".to_string()]);
}
