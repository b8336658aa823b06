//! Tests for the link repository and the chat resolver
//!
//! These work directly against a temporary redb database, below the
//! creation transaction.

use chrono::Utc;
use std::sync::Arc;
use tempfile::NamedTempFile;

use chatlink::chat::ChatRepository;
use chatlink::codec::encode;
use chatlink::database::init_db;
use chatlink::error::LinkError;
use chatlink::model::{ChatRef, NewLink, PathKind};
use chatlink::repository::LinkRepository;

fn setup_repos() -> (LinkRepository, ChatRepository, NamedTempFile) {
    let temp_db = NamedTempFile::new().expect("Failed to create temp file");
    let db = init_db(temp_db.path().to_str().unwrap()).expect("Failed to initialize test database");
    let db = Arc::new(db);
    (LinkRepository::new(db.clone()), ChatRepository::new(db), temp_db)
}

fn draft(path: &str, target: &str, tenant: Option<ChatRef>) -> NewLink {
    NewLink {
        path: path.to_string(),
        target_url: target.to_string(),
        creator: "tester".to_string(),
        created_at: Utc::now(),
        tenant_ref: tenant,
        enrichment: None,
    }
}

#[test]
fn test_manual_insert_is_readable_by_path() {
    let (links, _chats, _temp_db) = setup_repos();

    let record_id = links
        .write(|w| w.insert_incomplete(&draft("docs", "https://example.com/docs", None)))
        .unwrap();

    let record = links.get_by_path("docs", None).unwrap().expect("link should exist");
    assert_eq!(record.record_id, record_id);
    assert_eq!(record.path_kind, PathKind::Manual);
    assert_eq!(record.target_url, "https://example.com/docs");
    assert_eq!(links.count_by_path("docs", None).unwrap(), 1);
}

#[test]
fn test_record_ids_are_assigned_in_order() {
    let (links, _chats, _temp_db) = setup_repos();

    let first = links
        .write(|w| w.insert_incomplete(&draft("one", "https://example.com/1", None)))
        .unwrap();
    let second = links
        .write(|w| w.insert_incomplete(&draft("two", "https://example.com/2", None)))
        .unwrap();

    assert_eq!(first, 1);
    assert_eq!(second, 2);
}

#[test]
fn test_manual_path_taken_in_same_scope() {
    let (links, _chats, _temp_db) = setup_repos();

    links
        .write(|w| w.insert_incomplete(&draft("docs", "https://example.com/a", None)))
        .unwrap();
    let err = links
        .write(|w| w.insert_incomplete(&draft("docs", "https://example.com/b", None)))
        .unwrap_err();

    assert!(matches!(err, LinkError::PathTaken));
    assert_eq!(
        links.get_by_path("docs", None).unwrap().unwrap().target_url,
        "https://example.com/a"
    );
}

#[test]
fn test_scopes_are_isolated() {
    let (links, chats, _temp_db) = setup_repos();
    let chat = chats.resolve(42).unwrap();

    links
        .write(|w| w.insert_incomplete(&draft("docs", "https://example.com/global", None)))
        .unwrap();
    links
        .write(|w| w.insert_incomplete(&draft("docs", "https://example.com/chat", Some(chat))))
        .unwrap();

    assert_eq!(
        links.get_by_path("docs", None).unwrap().unwrap().target_url,
        "https://example.com/global"
    );
    assert_eq!(
        links.get_by_path("docs", Some(chat)).unwrap().unwrap().target_url,
        "https://example.com/chat"
    );
    assert!(links.get_by_path("docs", Some(ChatRef(999))).unwrap().is_none());
}

#[test]
fn test_auto_record_is_invisible_until_finalized() {
    let (links, _chats, _temp_db) = setup_repos();

    let record = links
        .write(|w| {
            let record_id = w.insert_incomplete(&draft("", "https://example.com/auto", None))?;
            let pending = w.get_by_id(record_id)?.expect("record inside transaction");
            assert!(pending.path.is_empty());
            assert_eq!(pending.path_kind, PathKind::Auto);
            w.finalize_path(record_id, &encode(record_id))
        })
        .unwrap();

    assert_eq!(record.path, encode(record.record_id));
    let by_path = links.get_by_path(&record.path, None).unwrap().unwrap();
    assert_eq!(by_path.record_id, record.record_id);
}

#[test]
fn test_finalize_path_is_idempotent() {
    let (links, _chats, _temp_db) = setup_repos();

    let first = links
        .write(|w| {
            let record_id = w.insert_incomplete(&draft("", "https://example.com/auto", None))?;
            w.finalize_path(record_id, &encode(record_id))
        })
        .unwrap();

    let again = links
        .write(|w| w.finalize_path(first.record_id, &first.path))
        .unwrap();

    assert_eq!(again.record_id, first.record_id);
    assert_eq!(again.path, first.path);
    assert_eq!(links.list_recent(10).unwrap().len(), 1);
}

#[test]
fn test_finalize_path_refuses_someone_elses_path() {
    let (links, _chats, _temp_db) = setup_repos();

    let taken_id = links
        .write(|w| {
            let record_id = w.insert_incomplete(&draft("", "https://example.com/a", None))?;
            w.finalize_path(record_id, &encode(record_id))?;
            Ok(record_id)
        })
        .unwrap();

    let err = links
        .write(|w| {
            let record_id = w.insert_incomplete(&draft("", "https://example.com/b", None))?;
            w.finalize_path(record_id, &encode(taken_id))
        })
        .unwrap_err();

    assert!(matches!(err, LinkError::PathTaken));
}

#[test]
fn test_finalize_missing_record() {
    let (links, _chats, _temp_db) = setup_repos();

    let err = links.write(|w| w.finalize_path(77, "ABC")).unwrap_err();
    assert!(matches!(err, LinkError::NotFound));
}

#[test]
fn test_failed_write_leaves_nothing_behind() {
    let (links, _chats, _temp_db) = setup_repos();

    let result: Result<(), LinkError> = links.write(|w| {
        w.insert_incomplete(&draft("docs", "https://example.com/docs", None))?;
        Err(LinkError::NotFound)
    });

    assert!(result.is_err());
    assert!(links.get_by_path("docs", None).unwrap().is_none());
    assert!(links.get_by_id(1).unwrap().is_none());
    assert_eq!(links.count_by_path("docs", None).unwrap(), 0);
}

#[test]
fn test_repeated_auto_insert_reuses_record() {
    let (links, _chats, _temp_db) = setup_repos();
    let auto = draft("", "https://example.com/same", None);

    let first = links.write(|w| w.insert_incomplete(&auto)).unwrap();
    let second = links.write(|w| w.insert_incomplete(&auto)).unwrap();

    assert_eq!(first, second);
    assert!(links.get_by_id(first + 1).unwrap().is_none());
}

#[test]
fn test_list_recent_newest_first() {
    let (links, _chats, _temp_db) = setup_repos();

    for i in 1..=5 {
        links
            .write(|w| {
                w.insert_incomplete(&draft(
                    &format!("link{i}"),
                    &format!("https://example.com/{i}"),
                    None,
                ))
            })
            .unwrap();
    }

    let recent = links.list_recent(3).unwrap();
    let paths: Vec<&str> = recent.iter().map(|record| record.path.as_str()).collect();
    assert_eq!(paths, ["link5", "link4", "link3"]);

    assert_eq!(links.list_recent(100).unwrap().len(), 5);
    assert!(links.list_recent(0).unwrap().is_empty());
}

#[test]
fn test_chat_resolve_is_idempotent() {
    let (_links, chats, _temp_db) = setup_repos();

    let first = chats.resolve(-100123).unwrap();
    let again = chats.resolve(-100123).unwrap();
    let other = chats.resolve(555).unwrap();

    assert_eq!(first, again);
    assert_ne!(first, other);

    let chat = chats.find(-100123).unwrap().expect("chat should exist");
    assert_eq!(chat.internal_ref, first);
    assert_eq!(chat.external_id, -100123);
    assert!(chats.find(1).unwrap().is_none());
}

#[test]
fn test_concurrent_chat_first_use_creates_one_chat() {
    let (_links, chats, _temp_db) = setup_repos();

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let chats = chats.clone();
            std::thread::spawn(move || chats.resolve(7).unwrap())
        })
        .collect();

    let refs: Vec<ChatRef> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert!(refs.iter().all(|r| *r == refs[0]));
}
