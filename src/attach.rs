//! Attaching and detaching labels on a note.
//!
//! Attaching validates the incoming batch against the note's current label
//! ids and rejects the whole batch on the first id that is already present,
//! naming the offending label. The read, the check and the write happen in
//! one IMMEDIATE transaction so two attach calls on the same note cannot both
//! pass the check.

use crate::db::NotesError;
use crate::labels::find_label;
use crate::notes::{read_label_ids, write_label_ids};
use rusqlite::{Connection, TransactionBehavior};

/// Outcome of a successful attach.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachOutcome {
    /// Ids appended, in the order they were appended.
    pub added: Vec<String>,
    /// The note's label ids after the write.
    pub labels: Vec<String>,
}

/// Display name of a label for conflict messages. A label that has been
/// deleted is reported by its id.
fn label_display_name(conn: &Connection, label_id: &str) -> Result<String, NotesError> {
    Ok(find_label(conn, label_id)?
        .map(|label| label.name)
        .unwrap_or_else(|| label_id.to_string()))
}

/// Collapses repeated ids in the incoming batch to their first occurrence.
fn dedup_batch(label_ids: &[String]) -> Vec<String> {
    let mut batch: Vec<String> = Vec::with_capacity(label_ids.len());
    for id in label_ids {
        if !batch.contains(id) {
            batch.push(id.clone());
        }
    }
    batch
}

/// Appends `label_ids` to a note's labels.
///
/// # Errors
/// - `NotFound` if the note does not exist
/// - `InvalidInput` for an empty batch
/// - `Conflict` naming the first current label that the batch repeats; the
///   note is left unchanged
pub fn attach_labels(conn: &mut Connection, note_id: &str, label_ids: &[String]) -> Result<AttachOutcome, NotesError> {
    if label_ids.is_empty() {
        return Err(NotesError::InvalidInput("No labels to add".to_string()));
    }
    let batch = dedup_batch(label_ids);
    if batch.len() != label_ids.len() {
        log::debug!("collapsed {} repeated ids in attach batch", label_ids.len() - batch.len());
    }

    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let mut current = read_label_ids(&tx, note_id)?;

    if let Some(existing) = current.iter().find(|id| batch.contains(id)) {
        let label = label_display_name(&tx, existing)?;
        log::warn!("label {} already attached to note {}", existing, note_id);
        return Err(NotesError::Conflict { label });
    }

    current.extend(batch.iter().cloned());
    write_label_ids(&tx, note_id, &current)?;
    tx.commit()?;

    log::debug!("attached {} labels to note {}", batch.len(), note_id);
    Ok(AttachOutcome {
        added: batch,
        labels: current,
    })
}

/// Removes every occurrence of `label_id` from a note. Succeeds even if the
/// id was not attached.
pub fn detach_label(conn: &mut Connection, note_id: &str, label_id: &str) -> Result<Vec<String>, NotesError> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let mut current = read_label_ids(&tx, note_id)?;
    current.retain(|id| id != label_id);
    write_label_ids(&tx, note_id, &current)?;
    tx.commit()?;
    Ok(current)
}

/// Removes all labels from a note.
pub fn detach_all_labels(conn: &Connection, note_id: &str) -> Result<(), NotesError> {
    write_label_ids(conn, note_id, &[])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{open_connection, open_in_memory};
    use crate::labels::{create_label, delete_label};
    use std::sync::Barrier;
    use std::thread;
    use crate::models::{Label, LabelStyle};
    use crate::notes::tests::sample_note;

    fn label(conn: &Connection, name: &str) -> Label {
        create_label(conn, "u1", name, "#ff0000", "#ffffff", LabelStyle::Default).unwrap()
    }

    #[test]
    fn test_attach_appends_in_order() {
        let mut conn = open_in_memory().unwrap();
        let note = sample_note(&conn, "u1", "Plan");
        let work = label(&conn, "Work");
        let home = label(&conn, "Home");

        let outcome = attach_labels(&mut conn, &note.id, &[home.id.clone(), work.id.clone()]).unwrap();
        assert_eq!(outcome.labels, vec![home.id.clone(), work.id.clone()]);
        assert_eq!(read_label_ids(&conn, &note.id).unwrap(), vec![home.id, work.id]);
    }

    #[test]
    fn test_attach_existing_label_conflicts_by_name() {
        let mut conn = open_in_memory().unwrap();
        let note = sample_note(&conn, "u1", "Plan");
        let work = label(&conn, "Work");
        let home = label(&conn, "Home");
        attach_labels(&mut conn, &note.id, &[work.id.clone()]).unwrap();

        let err = attach_labels(&mut conn, &note.id, &[home.id.clone(), work.id.clone()]).unwrap_err();
        match &err {
            NotesError::Conflict { label } => assert_eq!(label, "Work"),
            other => panic!("expected conflict, got {:?}", other),
        }
        assert!(err.to_string().contains("Work"));
        assert_eq!(err.status(), 400);

        // Whole batch rejected: Home was not added either.
        assert_eq!(read_label_ids(&conn, &note.id).unwrap(), vec![work.id]);
    }

    #[test]
    fn test_attach_conflict_on_dangling_label_reports_id() {
        let mut conn = open_in_memory().unwrap();
        let note = sample_note(&conn, "u1", "Plan");
        let old = label(&conn, "Old");
        attach_labels(&mut conn, &note.id, &[old.id.clone()]).unwrap();
        delete_label(&conn, &old.id).unwrap();

        let err = attach_labels(&mut conn, &note.id, &[old.id.clone()]).unwrap_err();
        assert!(matches!(err, NotesError::Conflict { ref label } if *label == old.id));
    }

    #[test]
    fn test_attach_collapses_repeats_within_batch() {
        let mut conn = open_in_memory().unwrap();
        let note = sample_note(&conn, "u1", "Plan");
        let work = label(&conn, "Work");

        let outcome = attach_labels(&mut conn, &note.id, &[work.id.clone(), work.id.clone()]).unwrap();
        assert_eq!(outcome.added, vec![work.id.clone()]);
        assert_eq!(read_label_ids(&conn, &note.id).unwrap(), vec![work.id]);
    }

    #[test]
    fn test_attach_rejects_empty_batch_and_missing_note() {
        let mut conn = open_in_memory().unwrap();
        let note = sample_note(&conn, "u1", "Plan");
        assert!(matches!(attach_labels(&mut conn, &note.id, &[]), Err(NotesError::InvalidInput(_))));
        assert!(matches!(
            attach_labels(&mut conn, "missing", &["x".to_string()]),
            Err(NotesError::NotFound(_))
        ));
    }

    #[test]
    fn test_detach_label_removes_every_occurrence() {
        let mut conn = open_in_memory().unwrap();
        let note = sample_note(&conn, "u1", "Plan");
        let ids = vec!["a".to_string(), "b".to_string(), "a".to_string()];
        write_label_ids(&conn, &note.id, &ids).unwrap();

        let remaining = detach_label(&mut conn, &note.id, "a").unwrap();
        assert_eq!(remaining, vec!["b".to_string()]);
    }

    #[test]
    fn test_detach_absent_label_is_not_an_error() {
        let mut conn = open_in_memory().unwrap();
        let note = sample_note(&conn, "u1", "Plan");
        assert!(detach_label(&mut conn, &note.id, "never-attached").unwrap().is_empty());
        assert!(matches!(detach_label(&mut conn, "missing", "x"), Err(NotesError::NotFound(_))));
    }

    #[test]
    fn test_detach_all_labels() {
        let mut conn = open_in_memory().unwrap();
        let note = sample_note(&conn, "u1", "Plan");
        let work = label(&conn, "Work");
        attach_labels(&mut conn, &note.id, &[work.id]).unwrap();

        detach_all_labels(&conn, &note.id).unwrap();
        assert!(read_label_ids(&conn, &note.id).unwrap().is_empty());
    }

    #[test]
    fn test_label_delete_leaves_note_reference() {
        let mut conn = open_in_memory().unwrap();
        let note = sample_note(&conn, "u1", "Plan");
        let work = label(&conn, "Work");
        attach_labels(&mut conn, &note.id, &[work.id.clone()]).unwrap();

        delete_label(&conn, &work.id).unwrap();
        assert_eq!(read_label_ids(&conn, &note.id).unwrap(), vec![work.id]);
    }

    #[test]
    fn test_concurrent_attach_of_same_label_conflicts_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.db");
        let first = open_connection(&path).unwrap();
        let second = open_connection(&path).unwrap();
        let note = sample_note(&first, "u1", "Plan");
        let work = label(&first, "Work");

        let barrier = Barrier::new(2);
        let results: Vec<Result<AttachOutcome, NotesError>> = thread::scope(|scope| {
            let handles: Vec<_> = [first, second]
                .into_iter()
                .map(|mut conn| {
                    let (barrier, note_id, label_id) = (&barrier, &note.id, &work.id);
                    scope.spawn(move || {
                        barrier.wait();
                        attach_labels(&mut conn, note_id, &[label_id.clone()])
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(results
            .iter()
            .any(|r| matches!(r, Err(NotesError::Conflict { label }) if label == "Work")));

        let check = open_connection(&path).unwrap();
        assert_eq!(read_label_ids(&check, &note.id).unwrap(), vec![work.id]);
    }
}
