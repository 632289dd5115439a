mod common;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use colindex::codec::bytes;
use colindex::core::error::ErrorKind;
use colindex::core::events::IndexEvent;
use colindex::core::index::IndexState;
use colindex::query::ast::Query;
use colindex::row::partitioner::Crc32Partitioner;
use colindex::secondary::host::{IndexExpression, Operator};
use common::{cell, cell_name, row_keys, Fixture, RecordingSink};

fn eq_text(column: &str, text: &str) -> Vec<IndexExpression> {
    vec![IndexExpression::equal_to(column, text.as_bytes().to_vec())]
}

fn eq_long(column: &str, value: i64) -> Vec<IndexExpression> {
    vec![IndexExpression::equal_to(column, value.to_be_bytes().to_vec())]
}

#[test]
fn text_predicate_resolves_rows() {
    let dir = tempfile::tempdir().unwrap();
    let fixture = Fixture::new(dir.path());
    let index = fixture.index("body").unwrap();

    fixture.write(&index, "alice", cell("post", "body", b"The quick brown fox", 1));
    fixture.write(&index, "bob", cell("post", "body", b"A lazy dog sleeps", 1));
    index.commit().unwrap();

    let rows = index.search(&eq_text("body", "foxes")).unwrap();
    assert_eq!(row_keys(&rows), vec![("alice".to_string(), "post".to_string())]);
    assert_eq!(rows[0].columns[0].value, b"The quick brown fox");

    let rows = index.search(&eq_text("body", "\"lazy dog\"")).unwrap();
    assert_eq!(row_keys(&rows), vec![("bob".to_string(), "post".to_string())]);

    assert!(index.search(&eq_text("body", "cat")).unwrap().is_empty());
}

#[test]
fn numeric_equality_is_exact() {
    let dir = tempfile::tempdir().unwrap();
    let fixture = Fixture::new(dir.path());
    let index = fixture.index("score").unwrap();

    fixture.write(&index, "alice", cell("post", "score", &42i64.to_be_bytes(), 1));
    index.commit().unwrap();

    assert_eq!(index.search(&eq_long("score", 42)).unwrap().len(), 1);
    assert!(index.search(&eq_long("score", 43)).unwrap().is_empty());
}

#[test]
fn update_leaves_one_document_per_identity() {
    let dir = tempfile::tempdir().unwrap();
    let fixture = Fixture::new(dir.path());
    let index = fixture.index("body").unwrap();

    let original = cell("post", "body", b"apple pie", 7);
    fixture.write(&index, "alice", original);
    index.commit().unwrap();

    let replacement = cell("post", "body", b"banana bread", 7);
    fixture.store.put(b"alice", replacement.clone());
    index.update(b"alice", &replacement).unwrap();
    index.update(b"alice", &replacement).unwrap();
    index.commit().unwrap();

    let identity = Query::term("full_key", "alice:post:body:7");
    assert_eq!(index.search_index().search(&identity, 10, None).unwrap().len(), 1);
    assert!(index.search(&eq_text("body", "apple")).unwrap().is_empty());
    assert_eq!(index.search(&eq_text("body", "banana")).unwrap().len(), 1);
}

#[test]
fn concurrent_searches_never_see_half_an_update() {
    let dir = tempfile::tempdir().unwrap();
    let fixture = Fixture::new(dir.path());
    let index = Arc::new(fixture.index("body").unwrap());

    fixture.write(&index, "alice", cell("post", "body", b"version zero", 3));
    index.commit().unwrap();

    let done = Arc::new(AtomicBool::new(false));
    let reader = {
        let index = index.clone();
        let done = done.clone();
        thread::spawn(move || {
            let identity = Query::term("full_key", "alice:post:body:3");
            let mut observed = 0;
            while !done.load(Ordering::SeqCst) {
                let hits = index.search_index().search(&identity, 10, None).unwrap();
                assert_eq!(hits.len(), 1);
                observed += 1;
            }
            observed
        })
    };

    for i in 0..25 {
        let text = format!("version {}", i);
        index.update(b"alice", &cell("post", "body", text.as_bytes(), 3)).unwrap();
        index.commit().unwrap();
    }
    done.store(true, Ordering::SeqCst);
    assert!(reader.join().unwrap() > 0);
}

#[test]
fn delete_removes_the_cell_version() {
    let dir = tempfile::tempdir().unwrap();
    let fixture = Fixture::new(dir.path());
    let index = fixture.index("body").unwrap();

    let column = cell("post", "body", b"short lived", 5);
    fixture.write(&index, "alice", column.clone());
    index.commit().unwrap();
    index.delete(b"alice", &column).unwrap();
    index.commit().unwrap();

    assert!(index.search(&eq_text("body", "short")).unwrap().is_empty());
}

#[test]
fn truncation_drops_older_documents() {
    let dir = tempfile::tempdir().unwrap();
    let fixture = Fixture::new(dir.path());
    let index = fixture.index("body").unwrap();

    fixture.write(&index, "a", cell("post", "body", b"shared words", 10));
    fixture.write(&index, "b", cell("post", "body", b"shared words", 20));
    fixture.write(&index, "c", cell("post", "body", b"shared words", 30));
    index.truncate_blocking(20).unwrap();

    let rows = index.search(&eq_text("body", "shared")).unwrap();
    assert_eq!(row_keys(&rows), vec![("c".to_string(), "post".to_string())]);
}

#[test]
fn hits_come_back_in_token_then_clustering_order() {
    let dir = tempfile::tempdir().unwrap();
    let fixture = Fixture::new(dir.path());
    let index = fixture.index("body").unwrap();

    // byte ordered partitioner: token order is key order
    fixture.write(&index, "t2", cell("A", "body", b"common", 1));
    fixture.write(&index, "t1", cell("B", "body", b"common", 1));
    index.commit().unwrap();
    fixture.write(&index, "t1", cell("A", "body", b"common", 1));
    index.commit().unwrap();

    let rows = index.search(&eq_text("body", "common")).unwrap();
    let keys: Vec<(String, String)> = vec![
        ("t1".into(), "A".into()),
        ("t1".into(), "B".into()),
        ("t2".into(), "A".into()),
    ];
    assert_eq!(row_keys(&rows), keys);
}

#[test]
fn result_cap_bounds_the_hits() {
    let dir = tempfile::tempdir().unwrap();
    let mut fixture = Fixture::new(dir.path());
    fixture.config.search_result_cap = 3;
    let index = fixture.index_with("body", Arc::new(Crc32Partitioner)).unwrap();

    for i in 0..10 {
        fixture.write(&index, &format!("user{}", i), cell("post", "body", b"everywhere", 1));
    }
    index.commit().unwrap();
    assert_eq!(index.search(&eq_text("body", "everywhere")).unwrap().len(), 3);
}

#[test]
fn rebuild_reproduces_results() {
    let dir = tempfile::tempdir().unwrap();
    let fixture = Fixture::new(dir.path());
    let events = vec![
        ("alice", cell("note", "body", b"rust borrow checker", 1)),
        ("bob", cell("note", "body", b"checker board game", 2)),
        ("carol", cell("memo", "body", b"rusty nails", 3)),
        ("alice", cell("memo", "body", b"board meeting notes", 4)),
    ];
    let queries = ["checker", "board", "rust*", "\"board game\"", "nails OR notes"];

    let drive = || {
        let index = fixture.index("body").unwrap();
        for (user, column) in &events {
            fixture.write(&index, user, column.clone());
        }
        index.commit().unwrap();
        let results: Vec<_> = queries
            .iter()
            .map(|q| row_keys(&index.search(&eq_text("body", q)).unwrap()))
            .collect();
        (index, results)
    };

    let (first, before) = drive();
    first.remove_index().unwrap();
    assert!(!first.search_index().path().exists());
    drop(first);

    let (_second, after) = drive();
    assert_eq!(before, after);
    assert_eq!(before[0].len(), 2);
}

#[test]
fn committed_documents_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let fixture = Fixture::new(dir.path());
    {
        let index = fixture.index("body").unwrap();
        fixture.write(&index, "alice", cell("post", "body", b"durable words", 1));
        index.commit().unwrap();
        // closed without commit: close flushes buffered work
        fixture.write(&index, "bob", cell("post", "body", b"durable too", 1));
        index.invalidate().unwrap();
    }

    let index = fixture.index("body").unwrap();
    assert_eq!(index.search(&eq_text("body", "durable")).unwrap().len(), 2);
}

#[test]
fn many_commits_keep_the_segment_count_bounded() {
    let dir = tempfile::tempdir().unwrap();
    let fixture = Fixture::new(dir.path());
    let index = fixture.index("body").unwrap();

    for i in 0..200 {
        fixture.write(&index, &format!("user{:03}", i), cell("post", "body", b"daily entry", i));
        index.commit().unwrap();
    }

    let stats = index.search_index().stats().unwrap();
    assert!(stats.segment_count <= fixture.config.max_segments_per_tier, "{} segments", stats.segment_count);
    assert_eq!(stats.live_docs, 200);
    assert_eq!(stats.deleted_docs, 0);

    let rows = index.search(&eq_text("body", "entry")).unwrap();
    assert_eq!(rows.len(), fixture.config.search_result_cap);
    assert_eq!(rows[0].partition_key, b"user000");
}

#[test]
fn second_instance_on_the_same_directory_fails() {
    let dir = tempfile::tempdir().unwrap();
    let fixture = Fixture::new(dir.path());
    let _first = fixture.index("body").unwrap();
    let err = fixture.index("body").err().unwrap();
    assert_eq!(err.kind, ErrorKind::IndexUnavailable);

    // a different column gets its own directory
    assert!(fixture.index("score").is_ok());
}

#[test]
fn closing_twice_is_a_lifecycle_error() {
    let dir = tempfile::tempdir().unwrap();
    let sink = Arc::new(RecordingSink::default());
    let fixture = Fixture::new(dir.path()).with_sink(sink.clone());
    let index = fixture.index("body").unwrap();
    fixture.write(&index, "alice", cell("post", "body", b"words", 1));

    index.invalidate().unwrap();
    assert_eq!(index.search_index().state(), IndexState::Closed);
    assert_eq!(index.search_index().close().unwrap_err().kind, ErrorKind::InvalidState);
    index.invalidate().unwrap();

    let err = index.insert(b"alice", &cell("post", "body", b"late", 2)).unwrap_err();
    assert_eq!(err.kind, ErrorKind::InvalidState);
    assert_eq!(index.search(&eq_text("body", "words")).unwrap_err().kind, ErrorKind::InvalidState);

    let events = sink.events.lock();
    assert!(matches!(events.first(), Some(IndexEvent::Opened { .. })));
    assert!(events.iter().any(|e| matches!(e, IndexEvent::DocumentWritten { replaced: false, .. })));
    assert!(events.iter().any(|e| matches!(e, IndexEvent::Closed { .. })));
    assert_eq!(events.iter().filter(|e| matches!(e, IndexEvent::Closed { .. })).count(), 1);
}

#[test]
fn indexing_predicate_is_first_equality_on_the_column() {
    let dir = tempfile::tempdir().unwrap();
    let fixture = Fixture::new(dir.path());
    let index = fixture.index("body").unwrap();

    let clause = vec![
        IndexExpression::new(b"body", Operator::Gt, b"a".to_vec()),
        IndexExpression::equal_to("score", 1i64.to_be_bytes().to_vec()),
        IndexExpression::equal_to("body", b"first".to_vec()),
        IndexExpression::equal_to("body", b"second".to_vec()),
    ];
    assert!(index.is_indexing(&clause));
    assert_eq!(
        index.searcher().select_indexing_predicate(&clause).map(|e| e.value.as_slice()),
        Some(b"first".as_slice())
    );

    let unrelated = &clause[..2];
    assert!(!index.is_indexing(unrelated));
    assert_eq!(index.search(unrelated).unwrap_err().kind, ErrorKind::InvalidArgument);
}

#[test]
fn indexes_only_its_own_cells() {
    let dir = tempfile::tempdir().unwrap();
    let fixture = Fixture::new(dir.path());
    let body = fixture.index("body").unwrap();
    let kind = fixture.index("kind").unwrap();

    assert!(body.indexes(&cell_name("post", "body")).unwrap());
    assert!(!body.indexes(&cell_name("post", "score")).unwrap());
    assert!(!body.indexes(&cell_name("post", "")).unwrap());
    assert!(kind.indexes(&cell_name("post", "")).unwrap());
    assert!(!kind.indexes(&cell_name("post", "body")).unwrap());
    assert_eq!(body.indexes(b"\x00").unwrap_err().kind, ErrorKind::Decode);
}

#[test]
fn key_column_index_matches_the_component() {
    let dir = tempfile::tempdir().unwrap();
    let fixture = Fixture::new(dir.path());
    let index = fixture.index("kind").unwrap();

    fixture.write(&index, "alice", cell("draft", "body", b"x", 1));
    fixture.write(&index, "bob", cell("published", "body", b"y", 1));
    index.commit().unwrap();

    let rows = index.search(&eq_text("kind", "draft")).unwrap();
    assert_eq!(row_keys(&rows), vec![("alice".to_string(), "draft".to_string())]);
}

#[test]
fn unsupported_column_type_fails_the_write() {
    let dir = tempfile::tempdir().unwrap();
    let fixture = Fixture::new(dir.path());
    let index = fixture.index("price").unwrap();

    let err = index.insert(b"alice", &cell("post", "price", &[0, 0, 0, 2, 0x30, 0x39], 1)).unwrap_err();
    assert_eq!(err.kind, ErrorKind::UnsupportedType);
    assert_eq!(index.live_size(), 0);
}

#[test]
fn sizes_follow_buffer_and_disk() {
    let dir = tempfile::tempdir().unwrap();
    let fixture = Fixture::new(dir.path());
    let index = fixture.index("body").unwrap();
    assert_eq!(index.index_name(), "posts_body_idx");

    fixture.write(&index, "alice", cell("post", "body", b"sized text", 1));
    assert!(index.live_size() > 0);
    index.force_blocking_flush().unwrap();
    assert_eq!(index.live_size(), 0);
    assert!(index.estimated_size().unwrap() > 0);

    let expected = bytes::to_hex(b"alice");
    let hits = index.search_index().search(&Query::term("partition_key", &expected), 1, None).unwrap();
    assert_eq!(hits.len(), 1);
}
