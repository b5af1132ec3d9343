use mentor_core::model::{
    CodeSpec, ProctoringCounters, ProctoringPolicy, QuestionDraft, QuestionKind, QuestionResult,
    Section, SectionResult, SessionToken, StudentId, Submission, SubmissionStatus, SubmitReason,
    TestDraft, TestId, TestKind, TestStatus, ViolationKind, ViolationRecord,
};
use mentor_core::time::fixed_now;
use storage::repository::{
    NewQuestionRecord, NewTestRecord, QuestionRepository, StorageError, SubmissionFilter,
    SubmissionRepository, TestFilter, TestRepository, ViolationRepository,
};
use storage::sqlite::SqliteRepository;

async fn connect(name: &str) -> SqliteRepository {
    let url = format!("sqlite:file:{name}?mode=memory&cache=shared");
    let repo = SqliteRepository::connect(&url).await.expect("connect");
    repo.migrate().await.expect("migrate");
    repo
}

fn test_record(title: &str, kind: TestKind, status: TestStatus) -> NewTestRecord {
    NewTestRecord {
        draft: TestDraft {
            title: title.into(),
            kind,
            status,
            proctoring: ProctoringPolicy::strict(),
            ..TestDraft::default()
        },
        created_at: fixed_now(),
    }
}

fn submission(test_id: TestId, session: SessionToken) -> Submission {
    Submission {
        id: None,
        session,
        test_id,
        test_title: "Placement".into(),
        student_id: StudentId::new(42),
        sections: vec![SectionResult {
            section: Section::Aptitude,
            correct_count: 1,
            total_questions: 2,
            score: 50,
            percent: 50,
        }],
        total_score: 50,
        overall_percent: 50,
        status: SubmissionStatus::Failed,
        time_spent_secs: 90,
        counters: ProctoringCounters {
            tab_switches: 2,
            ..ProctoringCounters::default()
        },
        violation_score: 20,
        reason: SubmitReason::TimeUp,
        submitted_at: fixed_now(),
        questions: vec![QuestionResult {
            question_id: mentor_core::model::QuestionId::new(1),
            section: Section::Aptitude,
            user_answer: "Not Answered".into(),
            correct_answer: "60".into(),
            is_correct: false,
            points_earned: 0,
            explanation: None,
        }],
    }
}

#[tokio::test]
async fn sqlite_round_trips_tests_and_questions() {
    let repo = connect("memdb_catalog").await;

    let id = repo
        .insert_new_test(test_record("Placement", TestKind::Comprehensive, TestStatus::Published))
        .await
        .unwrap();
    repo.insert_new_test(test_record("SQL drill", TestKind::Sql, TestStatus::Draft))
        .await
        .unwrap();

    let fetched = repo.get_test(id).await.unwrap().expect("test");
    assert_eq!(fetched.title(), "Placement");
    assert!(fetched.proctoring().watches_objects());

    let published = repo
        .list_tests(TestFilter {
            status: Some(TestStatus::Published),
            kind: None,
        })
        .await
        .unwrap();
    assert_eq!(published.len(), 1);
    let sql_only = repo
        .list_tests(TestFilter {
            status: None,
            kind: Some(TestKind::Sql),
        })
        .await
        .unwrap();
    assert_eq!(sql_only[0].title(), "SQL drill");

    let ids = repo
        .insert_questions(
            id,
            vec![
                NewQuestionRecord {
                    section: Section::Sql,
                    draft: QuestionDraft {
                        kind: QuestionKind::Sql,
                        prompt: "Count rows".into(),
                        code: Some(CodeSpec::Query {
                            schema: "CREATE TABLE t(x);".into(),
                            expected_output: "0".into(),
                        }),
                        ..QuestionDraft::default()
                    },
                },
                NewQuestionRecord {
                    section: Section::Aptitude,
                    draft: QuestionDraft {
                        prompt: "2 + 2".into(),
                        options: vec!["3".into(), "4".into()],
                        correct_answer: "1".into(),
                        ..QuestionDraft::default()
                    },
                },
            ],
        )
        .await
        .unwrap();
    assert_eq!(ids.len(), 2);

    let questions = repo.list_questions(id, None).await.unwrap();
    assert_eq!(questions[0].section(), Section::Aptitude);
    assert_eq!(questions[0].options(), ["3".to_owned(), "4".to_owned()]);
    assert_eq!(questions[1].points(), 10);
    assert!(matches!(questions[1].code(), Some(CodeSpec::Query { .. })));

    let updated = fetched.with_total_questions(repo.count_questions(id).await.unwrap());
    repo.update_test(&updated).await.unwrap();
    assert_eq!(repo.get_test(id).await.unwrap().unwrap().total_questions(), 2);

    assert_eq!(
        repo.delete_questions(id, Some(Section::Sql)).await.unwrap(),
        1
    );
    repo.delete_test(id).await.unwrap();
    assert!(repo.get_test(id).await.unwrap().is_none());
    assert_eq!(repo.count_questions(id).await.unwrap(), 0);
}

#[tokio::test]
async fn sqlite_rejects_an_invalid_question_batch_atomically() {
    let repo = connect("memdb_batch").await;
    let id = repo
        .insert_new_test(test_record("Batch", TestKind::Comprehensive, TestStatus::Draft))
        .await
        .unwrap();

    let result = repo
        .insert_questions(
            id,
            vec![
                NewQuestionRecord {
                    section: Section::Verbal,
                    draft: QuestionDraft {
                        prompt: "ok".into(),
                        correct_answer: "yes".into(),
                        ..QuestionDraft::default()
                    },
                },
                NewQuestionRecord {
                    section: Section::Verbal,
                    draft: QuestionDraft::default(),
                },
            ],
        )
        .await;
    assert!(matches!(result, Err(StorageError::Serialization(_))));
    assert_eq!(repo.count_questions(id).await.unwrap(), 0);
}

#[tokio::test]
async fn sqlite_persists_submissions_once_per_session() {
    let repo = connect("memdb_submissions").await;
    let test_id = repo
        .insert_new_test(test_record("Placement", TestKind::Comprehensive, TestStatus::Published))
        .await
        .unwrap();

    let session = SessionToken::generate();
    let id = repo
        .insert_submission(&submission(test_id, session))
        .await
        .unwrap();
    assert!(matches!(
        repo.insert_submission(&submission(test_id, session)).await,
        Err(StorageError::Conflict)
    ));

    let stored = repo.get_submission(id).await.unwrap().expect("submission");
    assert_eq!(stored.session, session);
    assert_eq!(stored.sections.len(), 1);
    assert_eq!(stored.questions[0].correct_answer, "60");
    assert_eq!(stored.counters.tab_switches, 2);
    assert_eq!(stored.reason, SubmitReason::TimeUp);

    assert_eq!(
        repo.count_attempts(test_id, StudentId::new(42)).await.unwrap(),
        1
    );
    let listed = repo
        .list_submissions(SubmissionFilter {
            test_id: Some(test_id),
            student_id: None,
        })
        .await
        .unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(
        repo.submission_for_session(session)
            .await
            .unwrap()
            .and_then(|s| s.id),
        Some(id)
    );

    repo.delete_submission(id).await.unwrap();
    assert!(matches!(
        repo.delete_submission(id).await,
        Err(StorageError::NotFound)
    ));
}

#[tokio::test]
async fn sqlite_logs_violations_per_session() {
    let repo = connect("memdb_violations").await;
    let session = SessionToken::generate();

    for kind in [ViolationKind::TabSwitch, ViolationKind::PhoneDetected] {
        repo.append_violation(&ViolationRecord::new(session, kind, fixed_now()))
            .await
            .unwrap();
    }
    repo.append_violation(&ViolationRecord::new(
        SessionToken::generate(),
        ViolationKind::CopyAttempt,
        fixed_now(),
    ))
    .await
    .unwrap();

    let logged = repo.violations_for_session(session).await.unwrap();
    assert_eq!(logged.len(), 2);
    assert_eq!(logged[0].kind, ViolationKind::TabSwitch);
    assert_eq!(logged[1].points, 20);
}
