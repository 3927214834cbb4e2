//! Testes de integração dos fluxos de chapas, processos e sessões.

use std::sync::Arc;

use chrono::{Duration, TimeZone, Utc};
use eleitoral::adjudication::{DecisionKind, SessionStatus, SessionSubject, SubjectDecision, VoteChoice};
use eleitoral::adversarial::{
    Admissibility, Challenge, Complaint, ProcessStatus, RoundKind, Target, Verdict,
};
use eleitoral::candidacy::{CandidacySlate, CandidacyStatus, MemberRole, SlateMember};
use eleitoral::deadline::ManualClock;
use eleitoral::hooks::{HookSystem, MetricsHook};
use eleitoral::store::{MemoryStore, Repository, Store};
use eleitoral::tally::MemoryVoteSource;
use eleitoral::{Actor, Claim, Config, EleitoralError, ElectoralCore, Violation};

struct Fixture {
    core: ElectoralCore,
    clock: Arc<ManualClock>,
    store: Arc<dyn Store>,
    election_id: String,
}

fn admin() -> Actor {
    Actor::new("admin").with_claim(Claim::Admin)
}

fn reviewer() -> Actor {
    Actor::new("reviewer").with_claim(Claim::Reviewer)
}

fn adjudicator() -> Actor {
    Actor::new("adjudicator").with_claim(Claim::Adjudicator)
}

fn author() -> Actor {
    Actor::new("author-1")
}

fn body() -> Vec<String> {
    vec!["m1".to_string(), "m2".to_string(), "m3".to_string()]
}

async fn fixture_with(hooks: Option<HookSystem>) -> Fixture {
    let clock = Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap(),
    ));
    let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
    let mut core = ElectoralCore::new(
        Config::default(),
        store.clone(),
        Arc::new(MemoryVoteSource::new()),
        clock.clone(),
    );
    if let Some(hooks) = hooks {
        core = core.with_hooks(hooks);
    }

    let election = core.create_election(&admin(), "Eleição 2026").await.unwrap();
    core.start_election(&admin(), &election.id).await.unwrap();

    Fixture {
        core,
        clock,
        store,
        election_id: election.id,
    }
}

async fn fixture() -> Fixture {
    fixture_with(None).await
}

/// Chapa com presidente e vice aprovados.
async fn approved_slate(f: &Fixture, number: u32) -> CandidacySlate {
    let core = &f.core;
    let slate = core
        .create_slate(&author(), &f.election_id, number, &format!("Chapa {}", number))
        .await
        .unwrap();
    let president = format!("p-{}", number);
    let vice = format!("v-{}", number);
    core.add_member(&author(), &slate.id, SlateMember::titular(&president, "Ana", MemberRole::President))
        .await
        .unwrap();
    core.add_member(&author(), &slate.id, SlateMember::titular(&vice, "Bruno", MemberRole::VicePresident))
        .await
        .unwrap();
    core.submit_slate(&author(), &slate.id).await.unwrap();
    core.start_review(&reviewer(), &slate.id).await.unwrap();
    core.approve_member(&reviewer(), &slate.id, &president).await.unwrap();
    core.approve_member(&reviewer(), &slate.id, &vice).await.unwrap();
    core.approve_slate(&reviewer(), &slate.id).await.unwrap()
}

/// Denúncia com defesa apresentada e enviada a julgamento.
async fn complaint_awaiting_judgment(f: &Fixture) -> String {
    let core = &f.core;
    let complaint = core
        .file_complaint(&Actor::new("citizen"), &f.election_id, None, "Propaganda irregular")
        .await
        .unwrap();
    core.decide_admissibility::<Complaint>(&adjudicator(), &complaint.id, Admissibility::Admit)
        .await
        .unwrap();
    core.open_next_round::<Complaint>(&adjudicator(), &complaint.id)
        .await
        .unwrap();
    core.submit_round::<Complaint>(&Actor::new("accused"), &complaint.id, "Defesa")
        .await
        .unwrap();
    core.send_to_judgment::<Complaint>(&adjudicator(), &complaint.id)
        .await
        .unwrap();
    complaint.id
}

async fn vote_all(f: &Fixture, session_id: &str, choices: &[(&str, VoteChoice)]) {
    for (member, choice) in choices {
        f.core
            .cast_vote(&Actor::new(*member), session_id, *choice, None)
            .await
            .unwrap();
    }
}

/// Impugnação admitida contra a chapa, com alegações apresentadas e enviada a
/// julgamento.
async fn challenge_awaiting_judgment(f: &Fixture, slate_id: &str) -> String {
    let core = &f.core;
    let challenge = core
        .file_challenge(
            &Actor::new("challenger"),
            &f.election_id,
            Target::Slate {
                slate_id: slate_id.to_string(),
            },
            "Documentação falsa",
        )
        .await
        .unwrap();
    core.decide_admissibility::<Challenge>(&adjudicator(), &challenge.id, Admissibility::Admit)
        .await
        .unwrap();
    core.open_next_round::<Challenge>(&adjudicator(), &challenge.id)
        .await
        .unwrap();
    core.submit_round::<Challenge>(&author(), &challenge.id, "Alegações")
        .await
        .unwrap();
    core.open_next_round::<Challenge>(&adjudicator(), &challenge.id)
        .await
        .unwrap();
    core.submit_round::<Challenge>(&Actor::new("challenger"), &challenge.id, "Contra-alegações")
        .await
        .unwrap();
    core.send_to_judgment::<Challenge>(&adjudicator(), &challenge.id)
        .await
        .unwrap();
    challenge.id
}

/// Sessão em que os três membros votam igual.
async fn judge_unanimously(f: &Fixture, subject: SessionSubject, choice: VoteChoice) -> String {
    let session = f
        .core
        .schedule_session(&adjudicator(), subject, body(), "m1", None)
        .await
        .unwrap();
    f.core.start_session(&adjudicator(), &session.id).await.unwrap();
    vote_all(f, &session.id, &[("m1", choice), ("m2", choice), ("m3", choice)]).await;
    f.core
        .conclude_session(&adjudicator(), &session.id, "Fundamentação", false)
        .await
        .unwrap();
    session.id
}

mod candidacy_tests {
    use super::*;

    #[tokio::test]
    async fn test_slate_reaches_registration() {
        let f = fixture().await;
        let slate = approved_slate(&f, 10).await;
        assert_eq!(slate.status, CandidacyStatus::Approved);

        let registered = f.core.register_slate(&admin(), &slate.id).await.unwrap();
        assert_eq!(registered.status, CandidacyStatus::Registered);
        assert_eq!(registered.history.last().map(|e| e.operation.as_str()), Some("register"));
    }

    #[tokio::test]
    async fn test_submit_requires_every_mandatory_role() {
        let f = fixture().await;
        let slate = f
            .core
            .create_slate(&author(), &f.election_id, 11, "Chapa 11")
            .await
            .unwrap();
        f.core
            .add_member(&author(), &slate.id, SlateMember::titular("p", "Ana", MemberRole::President))
            .await
            .unwrap();

        let err = f.core.submit_slate(&author(), &slate.id).await.unwrap_err();
        assert_eq!(
            err.violation(),
            Some(&Violation::MandatoryRoleUnfilled("vice_president".to_string()))
        );
        assert_eq!(f.core.slate(&slate.id).await.unwrap().status, CandidacyStatus::Draft);
    }

    #[tokio::test]
    async fn test_rejected_titular_blocks_approval() {
        let f = fixture().await;
        let slate = f
            .core
            .create_slate(&author(), &f.election_id, 12, "Chapa 12")
            .await
            .unwrap();
        f.core
            .add_member(&author(), &slate.id, SlateMember::titular("p", "Ana", MemberRole::President))
            .await
            .unwrap();
        f.core
            .add_member(&author(), &slate.id, SlateMember::titular("v", "Bruno", MemberRole::VicePresident))
            .await
            .unwrap();
        f.core.submit_slate(&author(), &slate.id).await.unwrap();
        f.core.start_review(&reviewer(), &slate.id).await.unwrap();
        f.core.approve_member(&reviewer(), &slate.id, "p").await.unwrap();
        f.core
            .reject_member(&reviewer(), &slate.id, "v", "Inelegível")
            .await
            .unwrap();

        let err = f.core.approve_slate(&reviewer(), &slate.id).await.unwrap_err();
        assert!(matches!(
            err,
            EleitoralError::Validation(Violation::MandatoryRoleUnfilled(_))
        ));
    }

    #[tokio::test]
    async fn test_removing_mandatory_titular_fails() {
        let f = fixture().await;
        let slate = f
            .core
            .create_slate(&author(), &f.election_id, 13, "Chapa 13")
            .await
            .unwrap();
        f.core
            .add_member(&author(), &slate.id, SlateMember::titular("p", "Ana", MemberRole::President))
            .await
            .unwrap();

        let err = f.core.remove_member(&author(), &slate.id, "p").await.unwrap_err();
        assert!(matches!(
            err,
            EleitoralError::Validation(Violation::MandatoryRoleUnfilled(_))
        ));
    }

    #[tokio::test]
    async fn test_document_round_trip() {
        let f = fixture().await;
        let slate = f
            .core
            .create_slate(&author(), &f.election_id, 14, "Chapa 14")
            .await
            .unwrap();
        f.core
            .add_member(&author(), &slate.id, SlateMember::titular("p", "Ana", MemberRole::President))
            .await
            .unwrap();
        f.core
            .add_member(&author(), &slate.id, SlateMember::titular("v", "Bruno", MemberRole::VicePresident))
            .await
            .unwrap();
        f.core.submit_slate(&author(), &slate.id).await.unwrap();
        f.core.start_review(&reviewer(), &slate.id).await.unwrap();

        let pending = f
            .core
            .request_documents(&reviewer(), &slate.id, vec!["Certidão".to_string()])
            .await
            .unwrap();
        assert_eq!(pending.status, CandidacyStatus::PendingDocuments);
        assert_eq!(pending.checklist, vec!["Certidão".to_string()]);

        let resubmitted = f.core.resubmit_slate(&author(), &slate.id).await.unwrap();
        assert_eq!(resubmitted.status, CandidacyStatus::AwaitingReview);
        assert!(resubmitted.checklist.is_empty());
    }

    #[tokio::test]
    async fn test_slate_number_is_unique_per_election() {
        let f = fixture().await;
        f.core
            .create_slate(&author(), &f.election_id, 20, "Chapa 20")
            .await
            .unwrap();

        let err = f
            .core
            .create_slate(&Actor::new("author-2"), &f.election_id, 20, "Outra")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            EleitoralError::Validation(Violation::InvalidArgument(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_slate_with_dependents_fails() {
        let f = fixture().await;
        let slate = f
            .core
            .create_slate(&author(), &f.election_id, 21, "Chapa 21")
            .await
            .unwrap();
        f.core
            .file_complaint(
                &Actor::new("citizen"),
                &f.election_id,
                Some(Target::Slate {
                    slate_id: slate.id.clone(),
                }),
                "Abuso",
            )
            .await
            .unwrap();

        let err = f.core.delete_slate(&slate.id).await.unwrap_err();
        assert_eq!(err.violation(), Some(&Violation::HasDependents));

        let other = f
            .core
            .create_slate(&author(), &f.election_id, 22, "Chapa 22")
            .await
            .unwrap();
        f.core.delete_slate(&other.id).await.unwrap();
        assert!(matches!(
            f.core.slate(&other.id).await,
            Err(EleitoralError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_stale_write_is_a_concurrency_conflict() {
        let f = fixture().await;
        let slate = f
            .core
            .create_slate(&author(), &f.election_id, 23, "Chapa 23")
            .await
            .unwrap();

        let repo: Repository<CandidacySlate> = Repository::new(f.store.clone());
        let stale = repo.get(&slate.id).await.unwrap();

        f.core
            .add_member(&author(), &slate.id, SlateMember::titular("p", "Ana", MemberRole::President))
            .await
            .unwrap();

        let err = repo.save(stale).await.unwrap_err();
        assert!(matches!(err, EleitoralError::ConcurrencyConflict { .. }));
        assert!(err.is_retryable());
        assert_eq!(f.core.slate(&slate.id).await.unwrap().members.len(), 1);
    }
}

mod adversarial_tests {
    use super::*;

    async fn complaint_with_open_defense(f: &Fixture) -> String {
        let complaint = f
            .core
            .file_complaint(&Actor::new("citizen"), &f.election_id, None, "Compra de votos")
            .await
            .unwrap();
        f.core
            .begin_review::<Complaint>(&adjudicator(), &complaint.id)
            .await
            .unwrap();
        f.core
            .decide_admissibility::<Complaint>(&adjudicator(), &complaint.id, Admissibility::Admit)
            .await
            .unwrap();
        let opened = f
            .core
            .open_next_round::<Complaint>(&adjudicator(), &complaint.id)
            .await
            .unwrap();
        assert_eq!(opened.status, ProcessStatus::AwaitingDefense);
        complaint.id
    }

    #[tokio::test]
    async fn test_late_defense_is_recorded_without_status_change() {
        let f = fixture().await;
        let id = complaint_with_open_defense(&f).await;

        f.clock.advance(Duration::days(6));
        let err = f
            .core
            .submit_round::<Complaint>(&Actor::new("accused"), &id, "Defesa tardia")
            .await
            .unwrap_err();
        assert_eq!(
            err.violation(),
            Some(&Violation::LateSubmission {
                round: "defense".to_string()
            })
        );

        let complaint = f.core.process::<Complaint>(&id).await.unwrap();
        assert_eq!(complaint.status, ProcessStatus::AwaitingDefense);
        assert_eq!(complaint.late_submissions.len(), 1);
        assert_eq!(complaint.late_submissions[0].round, RoundKind::Defense);
        assert_eq!(
            complaint.history.last().map(|e| e.operation.as_str()),
            Some("late_submission")
        );

        let closed = f
            .core
            .close_round::<Complaint>(&adjudicator(), &id)
            .await
            .unwrap();
        assert_eq!(closed.status, ProcessStatus::DefenseNotPresented);
    }

    #[tokio::test]
    async fn test_defense_on_due_instant_is_accepted() {
        let f = fixture().await;
        let id = complaint_with_open_defense(&f).await;

        f.clock.advance(Duration::days(5));
        let complaint = f
            .core
            .submit_round::<Complaint>(&Actor::new("accused"), &id, "Defesa")
            .await
            .unwrap();
        assert_eq!(complaint.status, ProcessStatus::DefensePresented);
    }

    #[tokio::test]
    async fn test_close_round_before_deadline_fails() {
        let f = fixture().await;
        let id = complaint_with_open_defense(&f).await;

        let err = f
            .core
            .close_round::<Complaint>(&adjudicator(), &id)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            EleitoralError::Validation(Violation::DeadlineNotElapsed { .. })
        ));
    }

    #[tokio::test]
    async fn test_sweep_lists_expired_windows() {
        let f = fixture().await;
        let id = complaint_with_open_defense(&f).await;
        assert!(f.core.sweep_expired().await.unwrap().is_empty());

        f.clock.advance(Duration::days(6));
        let expired = f.core.sweep_expired().await.unwrap();
        assert_eq!(expired.len(), 1);
        assert_eq!(expired[0].process_id, id);
        assert_eq!(expired[0].round, RoundKind::Defense);

        f.core
            .close_round::<Complaint>(&adjudicator(), &id)
            .await
            .unwrap();
        assert!(f.core.sweep_expired().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_admissibility_requires_adjudicator() {
        let f = fixture().await;
        let complaint = f
            .core
            .file_complaint(&Actor::new("citizen"), &f.election_id, None, "Denúncia")
            .await
            .unwrap();

        let err = f
            .core
            .decide_admissibility::<Complaint>(&admin(), &complaint.id, Admissibility::Admit)
            .await
            .unwrap_err();
        assert!(matches!(err, EleitoralError::Unauthorized { .. }));
    }

    #[tokio::test]
    async fn test_challenge_blocks_registration_until_dismissed() {
        let f = fixture().await;
        let slate = approved_slate(&f, 30).await;

        let challenge = f
            .core
            .file_challenge(
                &Actor::new("challenger"),
                &f.election_id,
                Target::Slate {
                    slate_id: slate.id.clone(),
                },
                "Documentação falsa",
            )
            .await
            .unwrap();
        f.core
            .decide_admissibility::<Challenge>(&adjudicator(), &challenge.id, Admissibility::Admit)
            .await
            .unwrap();

        let challenged = f.core.slate(&slate.id).await.unwrap();
        assert_eq!(challenged.status, CandidacyStatus::Challenged);
        assert!(challenged.open_challenges.contains(&challenge.id));
        assert!(matches!(
            f.core.register_slate(&admin(), &slate.id).await,
            Err(EleitoralError::InvalidTransition { .. })
        ));

        // alegações apresentadas, contra-alegações não
        f.core
            .open_next_round::<Challenge>(&adjudicator(), &challenge.id)
            .await
            .unwrap();
        f.core
            .submit_round::<Challenge>(&author(), &challenge.id, "Alegações")
            .await
            .unwrap();
        let counter = f
            .core
            .open_next_round::<Challenge>(&adjudicator(), &challenge.id)
            .await
            .unwrap();
        assert_eq!(counter.status, ProcessStatus::AwaitingCounterAllegations);

        f.clock.advance(Duration::days(6));
        f.core
            .close_round::<Challenge>(&adjudicator(), &challenge.id)
            .await
            .unwrap();
        f.core
            .send_to_judgment::<Challenge>(&adjudicator(), &challenge.id)
            .await
            .unwrap();

        let session = f
            .core
            .schedule_session(
                &adjudicator(),
                SessionSubject::Challenge(challenge.id.clone()),
                body(),
                "m1",
                None,
            )
            .await
            .unwrap();
        f.core.start_session(&adjudicator(), &session.id).await.unwrap();
        vote_all(
            &f,
            &session.id,
            &[
                ("m1", VoteChoice::Against),
                ("m2", VoteChoice::Against),
                ("m3", VoteChoice::Against),
            ],
        )
        .await;
        f.core
            .conclude_session(&adjudicator(), &session.id, "Sem provas", false)
            .await
            .unwrap();

        let judged = f.core.process::<Challenge>(&challenge.id).await.unwrap();
        assert_eq!(judged.status, ProcessStatus::Judged);
        assert_eq!(judged.verdict, Some(Verdict::Dismissed));

        let cleared = f.core.slate(&slate.id).await.unwrap();
        assert_eq!(cleared.status, CandidacyStatus::Approved);
        assert!(cleared.open_challenges.is_empty());

        // ainda cabe recurso contra o julgamento
        let err = f.core.register_slate(&admin(), &slate.id).await.unwrap_err();
        assert_eq!(err.violation(), Some(&Violation::OpenChallenges(1)));

        f.clock.advance(Duration::days(6));
        let registered = f.core.register_slate(&admin(), &slate.id).await.unwrap();
        assert_eq!(registered.status, CandidacyStatus::Registered);
    }

    #[tokio::test]
    async fn test_rounds_are_reserved_to_their_party() {
        let f = fixture().await;
        let slate = approved_slate(&f, 31).await;
        let challenge = f
            .core
            .file_challenge(
                &Actor::new("challenger"),
                &f.election_id,
                Target::Member {
                    slate_id: slate.id.clone(),
                    member_id: "p-31".to_string(),
                },
                "Inelegível",
            )
            .await
            .unwrap();
        assert_eq!(challenge.respondents, vec!["author-1".to_string(), "p-31".to_string()]);
        f.core
            .decide_admissibility::<Challenge>(&adjudicator(), &challenge.id, Admissibility::Admit)
            .await
            .unwrap();
        f.core
            .open_next_round::<Challenge>(&adjudicator(), &challenge.id)
            .await
            .unwrap();

        let err = f
            .core
            .submit_round::<Challenge>(&Actor::new("challenger"), &challenge.id, "Alegações")
            .await
            .unwrap_err();
        assert!(matches!(err, EleitoralError::Unauthorized { .. }));
        assert!(f
            .core
            .process::<Challenge>(&challenge.id)
            .await
            .unwrap()
            .late_submissions
            .is_empty());

        f.core
            .submit_round::<Challenge>(&Actor::new("p-31"), &challenge.id, "Alegações")
            .await
            .unwrap();
        f.core
            .open_next_round::<Challenge>(&adjudicator(), &challenge.id)
            .await
            .unwrap();
        let err = f
            .core
            .submit_round::<Challenge>(&author(), &challenge.id, "Contra-alegações")
            .await
            .unwrap_err();
        assert!(matches!(err, EleitoralError::Unauthorized { .. }));

        let presented = f
            .core
            .submit_round::<Challenge>(&Actor::new("challenger"), &challenge.id, "Contra-alegações")
            .await
            .unwrap();
        assert_eq!(presented.status, ProcessStatus::CounterAllegationsPresented);
    }

    #[tokio::test]
    async fn test_appeal_verdict_restores_rejected_slate() {
        let f = fixture().await;
        let slate = approved_slate(&f, 32).await;
        let challenge_id = challenge_awaiting_judgment(&f, &slate.id).await;

        judge_unanimously(&f, SessionSubject::Challenge(challenge_id.clone()), VoteChoice::For).await;
        let rejected = f.core.slate(&slate.id).await.unwrap();
        assert_eq!(rejected.status, CandidacyStatus::Rejected);

        f.core
            .file_appeal::<Challenge>(&author(), &challenge_id, "Documentos autênticos")
            .await
            .unwrap();
        judge_unanimously(&f, SessionSubject::Challenge(challenge_id.clone()), VoteChoice::Against).await;

        let challenge = f.core.process::<Challenge>(&challenge_id).await.unwrap();
        assert!(challenge.is_final());
        assert_eq!(challenge.verdict, Some(Verdict::Dismissed));

        let restored = f.core.slate(&slate.id).await.unwrap();
        assert_eq!(restored.status, CandidacyStatus::Approved);
        assert!(restored.rejection_reason.is_none());
        assert!(f.core.failed_dispatches().await.is_empty());

        let registered = f.core.register_slate(&admin(), &slate.id).await.unwrap();
        assert_eq!(registered.status, CandidacyStatus::Registered);
    }

    #[tokio::test]
    async fn test_appeal_verdict_rejects_cleared_slate() {
        let f = fixture().await;
        let slate = approved_slate(&f, 33).await;
        let challenge_id = challenge_awaiting_judgment(&f, &slate.id).await;

        judge_unanimously(&f, SessionSubject::Challenge(challenge_id.clone()), VoteChoice::Against).await;
        assert_eq!(
            f.core.slate(&slate.id).await.unwrap().status,
            CandidacyStatus::Approved
        );

        f.core
            .file_appeal::<Challenge>(&Actor::new("challenger"), &challenge_id, "Prova nova")
            .await
            .unwrap();
        let err = f.core.register_slate(&admin(), &slate.id).await.unwrap_err();
        assert_eq!(err.violation(), Some(&Violation::OpenChallenges(1)));

        judge_unanimously(&f, SessionSubject::Challenge(challenge_id.clone()), VoteChoice::For).await;
        let rejected = f.core.slate(&slate.id).await.unwrap();
        assert_eq!(rejected.status, CandidacyStatus::Rejected);
        assert!(rejected.upheld_challenges.contains(&challenge_id));
    }

    #[tokio::test]
    async fn test_candidacy_appeal_cannot_clear_pending_challenge() {
        let f = fixture().await;
        let slate = approved_slate(&f, 34).await;
        let challenge = f
            .core
            .file_challenge(
                &Actor::new("challenger"),
                &f.election_id,
                Target::Slate {
                    slate_id: slate.id.clone(),
                },
                "Documentação falsa",
            )
            .await
            .unwrap();
        f.core
            .decide_admissibility::<Challenge>(&adjudicator(), &challenge.id, Admissibility::Admit)
            .await
            .unwrap();
        f.core
            .open_next_round::<Challenge>(&adjudicator(), &challenge.id)
            .await
            .unwrap();

        let err = f
            .core
            .schedule_session(
                &adjudicator(),
                SessionSubject::CandidacyAppeal(slate.id.clone()),
                body(),
                "m1",
                Some(2),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, EleitoralError::InvalidTransition { .. }));

        assert!(f.core.register_slate(&admin(), &slate.id).await.is_err());
        let slate = f.core.slate(&slate.id).await.unwrap();
        assert_eq!(slate.status, CandidacyStatus::Challenged);
        assert!(slate.open_challenges.contains(&challenge.id));
    }

    #[tokio::test]
    async fn test_verdict_on_cancelled_slate_is_recorded() {
        let f = fixture().await;
        let slate = approved_slate(&f, 35).await;
        let challenge_id = challenge_awaiting_judgment(&f, &slate.id).await;
        f.core
            .cancel_slate(&author(), &slate.id, "Desistência")
            .await
            .unwrap();

        judge_unanimously(&f, SessionSubject::Challenge(challenge_id.clone()), VoteChoice::For).await;

        assert!(f.core.failed_dispatches().await.is_empty());
        let challenge = f.core.process::<Challenge>(&challenge_id).await.unwrap();
        assert_eq!(challenge.status, ProcessStatus::Judged);
        let cancelled = f.core.slate(&slate.id).await.unwrap();
        assert_eq!(cancelled.status, CandidacyStatus::Cancelled);
        assert!(cancelled.open_challenges.is_empty());
    }

    #[tokio::test]
    async fn test_failed_challenge_dispatch_leaves_nothing_half_applied() {
        let f = fixture().await;
        let slate = approved_slate(&f, 36).await;
        let challenge_id = challenge_awaiting_judgment(&f, &slate.id).await;

        // chapa em estado que não aceita o julgamento
        let repo: Repository<CandidacySlate> = Repository::new(f.store.clone());
        let mut stuck = repo.get(&slate.id).await.unwrap();
        stuck.status = CandidacyStatus::UnderReview;
        repo.save(stuck).await.unwrap();

        judge_unanimously(&f, SessionSubject::Challenge(challenge_id.clone()), VoteChoice::For).await;
        assert_eq!(f.core.failed_dispatches().await.len(), 1);
        let challenge = f.core.process::<Challenge>(&challenge_id).await.unwrap();
        assert_eq!(challenge.status, ProcessStatus::AwaitingJudgment);

        let mut fixed = repo.get(&slate.id).await.unwrap();
        fixed.status = CandidacyStatus::Challenged;
        repo.save(fixed).await.unwrap();

        assert_eq!(f.core.retry_failed_dispatches(&adjudicator()).await, 1);
        assert!(f.core.failed_dispatches().await.is_empty());
        let challenge = f.core.process::<Challenge>(&challenge_id).await.unwrap();
        assert_eq!(challenge.status, ProcessStatus::Judged);
        assert_eq!(challenge.judged_by.len(), 1);
        assert_eq!(
            f.core.slate(&slate.id).await.unwrap().status,
            CandidacyStatus::Rejected
        );
    }
}

mod adjudication_tests {
    use super::*;

    async fn open_session(f: &Fixture, complaint_id: &str) -> String {
        let session = f
            .core
            .schedule_session(
                &adjudicator(),
                SessionSubject::Complaint(complaint_id.to_string()),
                body(),
                "m1",
                None,
            )
            .await
            .unwrap();
        assert_eq!(session.quorum, 3);
        f.core.start_session(&adjudicator(), &session.id).await.unwrap();
        session.id
    }

    #[tokio::test]
    async fn test_quorum_not_met_then_majority_judges_complaint() {
        let f = fixture().await;
        let complaint_id = complaint_awaiting_judgment(&f).await;
        let session_id = open_session(&f, &complaint_id).await;

        vote_all(&f, &session_id, &[("m1", VoteChoice::For), ("m2", VoteChoice::For)]).await;
        let err = f
            .core
            .conclude_session(&adjudicator(), &session_id, "Procedente", false)
            .await
            .unwrap_err();
        assert_eq!(
            err.violation(),
            Some(&Violation::QuorumNotMet {
                cast: 2,
                required: 3
            })
        );

        vote_all(&f, &session_id, &[("m3", VoteChoice::Against)]).await;
        let session = f
            .core
            .conclude_session(&adjudicator(), &session_id, "Procedente", false)
            .await
            .unwrap();
        assert_eq!(session.status, SessionStatus::Concluded);
        let decision = session.decision.unwrap();
        assert_eq!(decision.kind, DecisionKind::Majority);
        assert_eq!(decision.outcome, SubjectDecision::Verdict(Verdict::Upheld));

        let complaint = f.core.process::<Complaint>(&complaint_id).await.unwrap();
        assert_eq!(complaint.status, ProcessStatus::Judged);
        assert_eq!(complaint.verdict, Some(Verdict::Upheld));
        assert!(complaint.appeal_deadline.is_some());
    }

    #[tokio::test]
    async fn test_abstention_tie_needs_casting_vote() {
        let f = fixture().await;
        let complaint_id = complaint_awaiting_judgment(&f).await;
        let session_id = open_session(&f, &complaint_id).await;

        vote_all(
            &f,
            &session_id,
            &[
                ("m1", VoteChoice::For),
                ("m2", VoteChoice::Against),
                ("m3", VoteChoice::Abstain),
            ],
        )
        .await;

        let err = f
            .core
            .conclude_session(&adjudicator(), &session_id, "Empate", false)
            .await
            .unwrap_err();
        assert_eq!(err.violation(), Some(&Violation::UnresolvedTie));

        let err = f
            .core
            .conclude_with_casting_vote(&Actor::new("m2"), &session_id, VoteChoice::For, "Qualidade", false)
            .await
            .unwrap_err();
        assert!(matches!(err, EleitoralError::Unauthorized { .. }));

        let session = f
            .core
            .conclude_with_casting_vote(&Actor::new("m1"), &session_id, VoteChoice::Against, "Qualidade", false)
            .await
            .unwrap();
        let decision = session.decision.unwrap();
        assert_eq!(decision.kind, DecisionKind::CastingVote);
        assert_eq!(decision.outcome, SubjectDecision::Verdict(Verdict::Dismissed));

        let complaint = f.core.process::<Complaint>(&complaint_id).await.unwrap();
        assert_eq!(complaint.verdict, Some(Verdict::Dismissed));
    }

    #[tokio::test]
    async fn test_duplicate_vote_is_rejected() {
        let f = fixture().await;
        let complaint_id = complaint_awaiting_judgment(&f).await;
        let session_id = open_session(&f, &complaint_id).await;

        vote_all(&f, &session_id, &[("m1", VoteChoice::For)]).await;
        let err = f
            .core
            .cast_vote(&Actor::new("m1"), &session_id, VoteChoice::Against, None)
            .await
            .unwrap_err();
        assert_eq!(
            err.violation(),
            Some(&Violation::DuplicateVote("m1".to_string()))
        );

        let err = f
            .core
            .cast_vote(&Actor::new("outsider"), &session_id, VoteChoice::For, None)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            EleitoralError::Validation(Violation::NotInDecidingBody(_))
        ));
    }

    #[tokio::test]
    async fn test_appeal_then_final_judgment() {
        let f = fixture().await;
        let complaint_id = complaint_awaiting_judgment(&f).await;
        let session_id = open_session(&f, &complaint_id).await;
        vote_all(
            &f,
            &session_id,
            &[
                ("m1", VoteChoice::For),
                ("m2", VoteChoice::For),
                ("m3", VoteChoice::For),
            ],
        )
        .await;
        f.core
            .conclude_session(&adjudicator(), &session_id, "Procedente", true)
            .await
            .unwrap();
        let judged = f.core.process::<Complaint>(&complaint_id).await.unwrap();
        assert_eq!(judged.verdict, Some(Verdict::PartiallyUpheld));

        f.clock.advance(Duration::days(2));
        let on_appeal = f
            .core
            .file_appeal::<Complaint>(&Actor::new("accused"), &complaint_id, "Cerceamento de defesa")
            .await
            .unwrap();
        assert_eq!(on_appeal.status, ProcessStatus::OnAppeal);

        let appeal_session = open_session(&f, &complaint_id).await;
        vote_all(
            &f,
            &appeal_session,
            &[
                ("m1", VoteChoice::Against),
                ("m2", VoteChoice::Against),
                ("m3", VoteChoice::For),
            ],
        )
        .await;
        f.core
            .conclude_session(&adjudicator(), &appeal_session, "Reforma", false)
            .await
            .unwrap();

        let final_judgment = f.core.process::<Complaint>(&complaint_id).await.unwrap();
        assert!(final_judgment.is_final());
        assert_eq!(final_judgment.verdict, Some(Verdict::Dismissed));
        assert!(matches!(
            f.core
                .file_appeal::<Complaint>(&Actor::new("citizen"), &complaint_id, "De novo")
                .await,
            Err(EleitoralError::InvalidTransition { .. })
        ));
    }

    #[tokio::test]
    async fn test_appeal_after_window_fails() {
        let f = fixture().await;
        let complaint_id = complaint_awaiting_judgment(&f).await;
        let session_id = open_session(&f, &complaint_id).await;
        vote_all(
            &f,
            &session_id,
            &[
                ("m1", VoteChoice::For),
                ("m2", VoteChoice::For),
                ("m3", VoteChoice::For),
            ],
        )
        .await;
        f.core
            .conclude_session(&adjudicator(), &session_id, "Procedente", false)
            .await
            .unwrap();

        f.clock.advance(Duration::days(6));
        let err = f
            .core
            .file_appeal::<Complaint>(&Actor::new("accused"), &complaint_id, "Recurso")
            .await
            .unwrap_err();
        assert_eq!(err.violation(), Some(&Violation::AppealWindowElapsed));
    }

    #[tokio::test]
    async fn test_failed_dispatch_is_retained() {
        let f = fixture().await;
        let complaint_id = complaint_awaiting_judgment(&f).await;
        let session_id = open_session(&f, &complaint_id).await;
        vote_all(
            &f,
            &session_id,
            &[
                ("m1", VoteChoice::For),
                ("m2", VoteChoice::For),
                ("m3", VoteChoice::Against),
            ],
        )
        .await;

        f.core
            .archive::<Complaint>(&adjudicator(), &complaint_id, "Perda de objeto")
            .await
            .unwrap();

        let session = f
            .core
            .conclude_session(&adjudicator(), &session_id, "Procedente", false)
            .await
            .unwrap();
        assert_eq!(session.status, SessionStatus::Concluded);

        let failed = f.core.failed_dispatches().await;
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].event.session_id, session_id);

        let complaint = f.core.process::<Complaint>(&complaint_id).await.unwrap();
        assert_eq!(complaint.status, ProcessStatus::Archived);
    }

    #[tokio::test]
    async fn test_schedule_requires_subject_awaiting_judgment() {
        let f = fixture().await;
        let complaint = f
            .core
            .file_complaint(&Actor::new("citizen"), &f.election_id, None, "Denúncia")
            .await
            .unwrap();

        let err = f
            .core
            .schedule_session(
                &adjudicator(),
                SessionSubject::Complaint(complaint.id.clone()),
                body(),
                "m1",
                None,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, EleitoralError::InvalidTransition { .. }));
    }

    #[tokio::test]
    async fn test_candidacy_appeal_maintains_slate() {
        let f = fixture().await;
        let pending = f
            .core
            .create_slate(&author(), &f.election_id, 41, "Chapa 41")
            .await
            .unwrap();
        f.core
            .add_member(&author(), &pending.id, SlateMember::titular("p41", "Ana", MemberRole::President))
            .await
            .unwrap();
        f.core
            .add_member(&author(), &pending.id, SlateMember::titular("v41", "Bruno", MemberRole::VicePresident))
            .await
            .unwrap();
        f.core.submit_slate(&author(), &pending.id).await.unwrap();
        f.core.start_review(&reviewer(), &pending.id).await.unwrap();
        f.core
            .reject_slate(&reviewer(), &pending.id, "Ata ausente")
            .await
            .unwrap();
        let appealed = f.core.appeal_rejection(&author(), &pending.id).await.unwrap();
        assert_eq!(appealed.status, CandidacyStatus::AwaitingAppealJudgment);

        let session = f
            .core
            .schedule_session(
                &adjudicator(),
                SessionSubject::CandidacyAppeal(pending.id.clone()),
                body(),
                "m1",
                Some(2),
            )
            .await
            .unwrap();
        f.core.start_session(&adjudicator(), &session.id).await.unwrap();
        vote_all(&f, &session.id, &[("m1", VoteChoice::For), ("m2", VoteChoice::For)]).await;
        f.core
            .conclude_session(&adjudicator(), &session.id, "Ata apresentada", false)
            .await
            .unwrap();

        let maintained = f.core.slate(&pending.id).await.unwrap();
        assert_eq!(maintained.status, CandidacyStatus::Approved);
        assert!(maintained.rejection_reason.is_none());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_simultaneous_votes_by_one_member() {
        let f = fixture().await;
        let complaint_id = complaint_awaiting_judgment(&f).await;
        let session_id = open_session(&f, &complaint_id).await;
        let core = Arc::new(f.core);

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let core = core.clone();
                let session_id = session_id.clone();
                tokio::spawn(async move {
                    let choice = if i % 2 == 0 {
                        VoteChoice::For
                    } else {
                        VoteChoice::Against
                    };
                    core.cast_vote(&Actor::new("m1"), &session_id, choice, None)
                        .await
                })
            })
            .collect();

        let mut accepted = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => accepted += 1,
                Err(err) => assert_eq!(
                    err.violation(),
                    Some(&Violation::DuplicateVote("m1".to_string()))
                ),
            }
        }
        assert_eq!(accepted, 1);

        let session = core.session(&session_id).await.unwrap();
        assert_eq!(session.votes.len(), 1);
        assert_eq!(session.votes[0].member_id, "m1");
    }

    #[tokio::test]
    async fn test_metrics_hook_counts_decisions() {
        let metrics = Arc::new(MetricsHook::new());
        let mut hooks = HookSystem::new();
        hooks.register(Box::new(metrics.clone()));
        let f = fixture_with(Some(hooks)).await;

        let complaint_id = complaint_awaiting_judgment(&f).await;
        let session_id = open_session(&f, &complaint_id).await;
        vote_all(
            &f,
            &session_id,
            &[
                ("m1", VoteChoice::For),
                ("m2", VoteChoice::For),
                ("m3", VoteChoice::For),
            ],
        )
        .await;
        f.core
            .conclude_session(&adjudicator(), &session_id, "Procedente", false)
            .await
            .unwrap();

        let snapshot = metrics.metrics();
        assert_eq!(snapshot.decisions, 1);
        assert_eq!(snapshot.unanimous, 1);
        assert!(snapshot.transitions > 10);
    }
}
