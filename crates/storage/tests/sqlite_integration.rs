use chrono::Duration;
use storage::repository::{ProgressRepository, ScriptRepository, Storage};
use storage::sqlite::SqliteRepository;
use walkthrough_core::model::{
    DrillKind, LearnerId, MasteredEvent, OrgId, ProgressRecord, RecallPrompt, ScriptDraft,
    ScriptId, SectionDraft, StepDraft,
};
use walkthrough_core::time::fixed_now;

fn draft(code: &str, first_step: &str) -> ScriptDraft {
    ScriptDraft {
        class_code: code.into(),
        sections: vec![SectionDraft {
            title: "Engine compartment".into(),
            critical: false,
            steps: vec![StepDraft {
                id: "oil".into(),
                label: Some("Oil".into()),
                text: first_step.into(),
                must_say: true,
                pass_fail: false,
                tokens: Some(vec!["engine".into()]),
            }],
        }],
        recall_prompts: vec![RecallPrompt {
            question: "What is this gauge?".into(),
            image: Some("gauge.jpg".into()),
            answers: vec!["oil pressure".into()],
        }],
    }
}

async fn repo(name: &str) -> SqliteRepository {
    let url = format!("sqlite:file:{name}?mode=memory&cache=shared");
    let repo = SqliteRepository::connect(&url).await.expect("connect");
    repo.migrate().await.expect("migrate");
    repo
}

#[tokio::test]
async fn sqlite_roundtrips_default_and_org_scripts() {
    let repo = repo("memdb_scripts").await;
    let code = ScriptId::new("A");
    let org = OrgId::new("north-school");

    repo.upsert_default_script(&draft("A", "Check engine oil level"))
        .await
        .unwrap();
    repo.upsert_org_script(&org, &draft("A", "Check engine oil with the dipstick"))
        .await
        .unwrap();

    let default = repo.default_script(&code).await.unwrap().expect("default");
    assert_eq!(default, draft("A", "Check engine oil level"));

    let custom = repo
        .org_script(&org, &code)
        .await
        .unwrap()
        .expect("override");
    assert_eq!(
        custom.sections[0].steps[0].text,
        "Check engine oil with the dipstick"
    );

    assert!(
        repo.org_script(&OrgId::new("other"), &code)
            .await
            .unwrap()
            .is_none()
    );
    assert!(
        repo.default_script(&ScriptId::new("B"))
            .await
            .unwrap()
            .is_none()
    );
}

#[tokio::test]
async fn sqlite_upsert_replaces_existing_script() {
    let repo = repo("memdb_replace").await;
    repo.upsert_default_script(&draft("B", "first"))
        .await
        .unwrap();
    repo.upsert_default_script(&draft("B", "second"))
        .await
        .unwrap();

    let stored = repo
        .default_script(&ScriptId::new("B"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.sections[0].steps[0].text, "second");
}

#[tokio::test]
async fn sqlite_lists_class_codes_per_org() {
    let repo = repo("memdb_codes").await;
    let org = OrgId::new("north-school");
    repo.upsert_default_script(&draft("B", "x")).await.unwrap();
    repo.upsert_default_script(&draft("A", "x")).await.unwrap();
    repo.upsert_org_script(&org, &draft("P", "x"))
        .await
        .unwrap();
    repo.upsert_org_script(&org, &draft("A", "x"))
        .await
        .unwrap();

    let codes = repo.class_codes(Some(&org)).await.unwrap();
    assert_eq!(
        codes,
        [ScriptId::new("A"), ScriptId::new("B"), ScriptId::new("P")]
    );
    let codes = repo.class_codes(None).await.unwrap();
    assert_eq!(codes, [ScriptId::new("A"), ScriptId::new("B")]);
}

#[tokio::test]
async fn sqlite_progress_is_append_only_and_keeps_first_timestamp() {
    let repo = repo("memdb_progress").await;
    let learner = LearnerId::new("learner-1");
    let script = ScriptId::new("A");
    let now = fixed_now();

    assert!(
        repo.load_progress(&learner, &script)
            .await
            .unwrap()
            .is_none()
    );

    let mut record = ProgressRecord::empty(learner.clone(), script.clone());
    record.mark_complete(DrillKind::FillCloze, now);
    repo.save_progress(&record).await.unwrap();

    let mut later = ProgressRecord::empty(learner.clone(), script.clone());
    later.mark_complete(DrillKind::FillCloze, now + Duration::hours(2));
    later.mark_complete(DrillKind::TypePhrase, now + Duration::hours(2));
    repo.save_progress(&later).await.unwrap();

    let stored = repo
        .load_progress(&learner, &script)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.completed_at(DrillKind::FillCloze), Some(now));
    assert!(stored.is_complete(DrillKind::TypePhrase));
    assert!(!stored.is_complete(DrillKind::OrderSteps));
    assert!(stored.mastered_at().is_none());

    let other = repo
        .load_progress(&LearnerId::new("learner-2"), &script)
        .await
        .unwrap();
    assert!(other.is_none());
}

#[tokio::test]
async fn sqlite_mastery_is_written_once() {
    let repo = repo("memdb_mastery").await;
    let learner = LearnerId::new("learner-1");
    let script = ScriptId::new("A");
    let now = fixed_now();

    let mut record = ProgressRecord::empty(learner.clone(), script.clone());
    for kind in DrillKind::ALL {
        record.mark_complete(kind, now);
    }
    repo.save_progress(&record).await.unwrap();

    let event = MasteredEvent {
        learner_id: learner.clone(),
        script_id: script.clone(),
        mastered_at: now,
    };
    repo.record_mastery(&event).await.unwrap();
    repo.record_mastery(&MasteredEvent {
        mastered_at: now + Duration::days(1),
        ..event
    })
    .await
    .unwrap();

    let stored = repo
        .load_progress(&learner, &script)
        .await
        .unwrap()
        .unwrap();
    assert!(stored.all_complete());
    assert_eq!(stored.mastered_at(), Some(now));
}

#[tokio::test]
async fn storage_sqlite_runs_migrations_twice() {
    let url = "sqlite:file:memdb_storage?mode=memory&cache=shared";
    let first = Storage::sqlite(url).await.expect("first");
    first
        .scripts
        .upsert_default_script(&draft("A", "x"))
        .await
        .unwrap();

    let second = Storage::sqlite(url).await.expect("second");
    let codes = second.scripts.class_codes(None).await.unwrap();
    assert_eq!(codes, [ScriptId::new("A")]);
}
