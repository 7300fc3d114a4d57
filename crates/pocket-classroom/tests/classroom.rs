//! End-to-end workflows through the public API.

use pocket_classroom::study::{grade_quiz, search_notes};
use pocket_classroom::{
    Capsule, CapsuleService, Error, Keys, Level, MemoryStore, ProgressService, QuizQuestion,
    RecordStore, SqliteStore, ValidationError,
};
use tempfile::TempDir;

fn biology() -> Capsule {
    Capsule::new("Cell Biology")
        .with_subject("Biology")
        .with_level(Level::Intermediate)
        .with_note("Mitochondria produce ATP")
        .with_note("Ribosomes build proteins")
        .with_flashcard("ATP", "Energy currency")
        .with_flashcard("DNA", "Genetic code")
        .with_question(QuizQuestion {
            question: "Where is ATP made?".to_string(),
            options: vec![
                "Nucleus".to_string(),
                "Mitochondria".to_string(),
                "Golgi".to_string(),
            ],
            correct_index: 1,
            explanation: None,
        })
        .with_resource("Khan Academy", "https://www.khanacademy.org/science/biology")
}

#[test]
fn saved_capsule_loads_back_with_service_fields() {
    let store = MemoryStore::new();
    let capsules = CapsuleService::new(&store, Keys::default());

    let id = capsules.save(biology()).unwrap();
    let loaded = capsules.load(&id).unwrap().unwrap();

    assert!(loaded.content_eq(&biology()));
    assert_eq!(loaded.id.as_deref(), Some(id.as_str()));
    assert!(loaded.created_at.is_some());
    assert!(loaded.last_updated.is_some());
}

#[test]
fn study_session_survives_reopen() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("classroom.db");
    let keys = Keys::default();

    let id = {
        let store = SqliteStore::open(&db_path).unwrap();
        let capsules = CapsuleService::new(&store, keys.clone());
        let progress = ProgressService::new(&store, keys.clone());

        let id = capsules.save(biology()).unwrap();
        progress.record_flashcard_status(&id, 1, true).unwrap();

        let capsule = capsules.require(&id).unwrap();
        let result = grade_quiz(&capsule.quiz, &[Some(1)]);
        assert_eq!(result.score, 100);
        let outcome = progress.record_best_score(&id, result.score).unwrap();
        assert!(outcome.new_best);
        id
    };

    let store = SqliteStore::open(&db_path).unwrap();
    let capsules = CapsuleService::new(&store, keys.clone());
    let progress = ProgressService::new(&store, keys);

    let index = capsules.list_index().unwrap();
    assert_eq!(index.len(), 1);
    assert_eq!(index[0].id, id);
    assert_eq!(index[0].level, Some(Level::Intermediate));

    let record = progress.load_progress(&id);
    assert_eq!(record.status(0), None);
    assert_eq!(record.status(1), Some(true));
    assert_eq!(record.best_score, Some(100));

    let lower = progress.record_best_score(&id, 40).unwrap();
    assert!(!lower.new_best);
    assert_eq!(lower.best, 100);
}

#[test]
fn export_then_import_on_another_store() {
    let source = MemoryStore::new();
    let source_lib = CapsuleService::new(&source, Keys::default());
    let id = source_lib.save(biology()).unwrap();
    let json = source_lib.export(&id).unwrap().unwrap();

    let dir = TempDir::new().unwrap();
    let target = SqliteStore::open(dir.path().join("other.db")).unwrap();
    let target_lib = CapsuleService::new(&target, Keys::default());
    let new_id = target_lib.import(&json).unwrap();
    assert_ne!(new_id, id);

    let original = source_lib.require(&id).unwrap();
    let imported = target_lib.require(&new_id).unwrap();
    assert!(original.content_eq(&imported));
    assert_eq!(search_notes(&imported, "ribosome").len(), 1);
}

#[test]
fn delete_removes_everything_for_the_capsule() {
    let store = MemoryStore::new();
    let keys = Keys::default();
    let capsules = CapsuleService::new(&store, keys.clone());
    let progress = ProgressService::new(&store, keys.clone());

    let keep = capsules.save(Capsule::new("Keep").with_note("stay")).unwrap();
    let drop = capsules.save(biology()).unwrap();
    progress.record_best_score(&drop, 50).unwrap();

    assert!(capsules.delete(&drop).unwrap());
    assert!(!capsules.delete(&drop).unwrap());

    assert!(store.get(&keys.capsule(&drop)).unwrap().is_none());
    assert!(store.get(&keys.progress(&drop)).unwrap().is_none());

    let err = progress.record_flashcard_status(&drop, 0, true).unwrap_err();
    assert!(err.is_not_found());
    assert!(store.get(&keys.progress(&drop)).unwrap().is_none());
    let ids: Vec<_> = capsules
        .list_index()
        .unwrap()
        .into_iter()
        .map(|e| e.id)
        .collect();
    assert_eq!(ids, vec![keep]);
}

#[test]
fn prefixes_isolate_libraries_in_one_store() {
    let dir = TempDir::new().unwrap();
    let store = SqliteStore::open(dir.path().join("shared.db")).unwrap();
    let mine = CapsuleService::new(&store, Keys::new("mine_"));
    let theirs = CapsuleService::new(&store, Keys::new("theirs_"));

    let id = mine.save(biology()).unwrap();
    assert!(theirs.list_index().unwrap().is_empty());
    assert!(theirs.load(&id).unwrap().is_none());
    assert_eq!(mine.list_index().unwrap().len(), 1);
}

#[test]
fn rejected_saves_leave_the_store_untouched() {
    let store = MemoryStore::new();
    let capsules = CapsuleService::new(&store, Keys::default());

    let err = capsules
        .save(Capsule::new("   ").with_note("x"))
        .unwrap_err();
    assert_eq!(err.as_validation(), Some(&ValidationError::MissingTitle));

    let err = capsules.save(Capsule::new("Nothing here")).unwrap_err();
    assert_eq!(err.as_validation(), Some(&ValidationError::EmptyCapsule));

    let err = capsules
        .save(Capsule::new("Links").with_resource("bad", "not a url"))
        .unwrap_err();
    assert!(matches!(
        err.as_validation(),
        Some(ValidationError::InvalidUrl { .. })
    ));

    assert!(store.is_empty());
}

#[test]
fn quota_failure_is_atomic() {
    let store = MemoryStore::with_quota(600);
    let capsules = CapsuleService::new(&store, Keys::default());

    let id = capsules.save(Capsule::new("Small").with_note("ok")).unwrap();
    let before = store.len();

    let big = Capsule::new("Huge").with_note("x".repeat(2_000));
    let err = capsules.save(big).unwrap_err();
    assert!(matches!(err, Error::QuotaExceeded { .. }));

    assert_eq!(store.len(), before);
    let index = capsules.list_index().unwrap();
    assert_eq!(index.len(), 1);
    assert_eq!(index[0].id, id);
}

#[test]
fn score_out_of_range_is_rejected() {
    let store = MemoryStore::new();
    let progress = ProgressService::new(&store, Keys::default());

    let err = progress.record_best_score("abc", 101).unwrap_err();
    assert_eq!(
        err.as_validation(),
        Some(&ValidationError::ScoreOutOfRange(101))
    );
    assert!(progress.load_progress("abc").best_score.is_none());
}
