//! Behavior-driven tests for application-scoped resources.

use std::time::Duration;

use luis_core::{Application, HttpMethod, LuisError, QueryOptions, TrainOptions, TrainingStatus};
use serde_json::json;
use tokio_util::sync::CancellationToken;

use luis_tests::FakeLuis;

async fn demo_app(fake: &std::sync::Arc<FakeLuis>) -> Application {
    fake.add_app("app-1", "Demo");
    luis_tests::subscription(fake, 4)
        .application("app-1", &CancellationToken::new())
        .await
        .expect("fetch should succeed")
        .expect("application should exist")
}

// =============================================================================
// Training
// =============================================================================

#[tokio::test]
async fn training_polls_until_no_model_is_pending() {
    // Given: Two models that need a few polls to finish
    let fake = FakeLuis::new();
    fake.push_training_round(json!([
        {"modelId": "m1", "details": {"statusId": 9, "status": "Queued"}},
        {"modelId": "m2", "details": {"statusId": 3, "status": "InProgress"}}
    ]));
    fake.push_training_round(json!([
        {"modelId": "m1", "details": {"statusId": 3, "status": "InProgress"}},
        {"modelId": "m2", "details": {"statusId": 0, "status": "Success"}}
    ]));
    fake.push_training_round(json!([
        {"modelId": "m1", "details": {"statusId": 2, "status": "UpToDate"}},
        {"modelId": "m2", "details": {"statusId": 0, "status": "Success"}}
    ]));
    let app = demo_app(&fake).await;

    // When: Training runs
    let trained = app
        .train(&CancellationToken::new())
        .await
        .expect("training should succeed");

    // Then: Polling stopped once everything settled
    assert!(trained);
    assert_eq!(fake.requests_to(HttpMethod::Get, "apps/app-1/versions/0.1/train"), 3);

    let statuses = app
        .training_status(&CancellationToken::new())
        .await
        .expect("status should load");
    assert!(statuses.iter().all(|model| !model.status().is_pending()));
    assert_eq!(statuses[0].status(), TrainingStatus::UpToDate);
}

#[tokio::test]
async fn training_failure_names_the_failing_model() {
    let fake = FakeLuis::new();
    fake.add_model("m7", "BookFlight");
    fake.push_training_round(json!([
        {"modelId": "m7", "details": {"statusId": 1, "status": "Fail", "failureReason": "NoExamples"}}
    ]));
    let app = demo_app(&fake).await;

    let error = app
        .train(&CancellationToken::new())
        .await
        .expect_err("training should fail");

    assert_eq!(error.to_string(), "Training failed for BookFlight: NoExamples");
}

#[tokio::test]
async fn training_failure_falls_back_to_the_model_id_when_unnamed() {
    let fake = FakeLuis::new();
    fake.push_training_round(json!([
        {"modelId": "m9", "details": {"statusId": 1, "status": "Fail", "failureReason": "Broken"}}
    ]));
    let app = demo_app(&fake).await;

    let error = app
        .train(&CancellationToken::new())
        .await
        .expect_err("training should fail");

    assert!(matches!(error, LuisError::TrainingFailed { ref model, .. } if model == "m9"));
}

#[tokio::test]
async fn when_training_request_is_rejected_train_reports_false() {
    let fake = FakeLuis::new();
    fake.reject_training(400);
    let app = demo_app(&fake).await;

    let trained = app
        .train(&CancellationToken::new())
        .await
        .expect("rejection is not an error");

    assert!(!trained);
    assert_eq!(fake.requests_to(HttpMethod::Get, "apps/app-1/versions/0.1/train"), 0);
}

#[tokio::test]
async fn training_that_never_settles_hits_the_deadline() {
    // Given: A model stuck in progress
    let fake = FakeLuis::new();
    fake.push_training_round(json!([
        {"modelId": "m1", "details": {"statusId": 3, "status": "InProgress"}}
    ]));
    let app = demo_app(&fake).await;

    // When: Training runs with a short deadline
    let options = TrainOptions {
        poll_interval: Duration::from_millis(5),
        deadline: None,
    }
    .with_deadline(Duration::from_millis(40));
    let outcome = app.train_with(options, &CancellationToken::new()).await;

    // Then: The wait is abandoned
    assert!(matches!(outcome, Err(LuisError::TrainingTimedOut(_))));
}

#[tokio::test]
async fn training_stops_polling_when_cancelled() {
    let fake = FakeLuis::new();
    fake.push_training_round(json!([
        {"modelId": "m1", "details": {"statusId": 3, "status": "InProgress"}}
    ]));
    let app = demo_app(&fake).await;
    let cancel = CancellationToken::new();

    let canceller = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(30)).await;
            cancel.cancel();
        })
    };
    let outcome = app.train(&cancel).await;
    canceller.await.expect("task should not panic");

    assert!(matches!(outcome, Err(LuisError::Cancelled)));
}

// =============================================================================
// Publishing and Keys
// =============================================================================

#[tokio::test]
async fn publish_targets_the_application_with_version_and_slot() {
    let fake = FakeLuis::new();
    let app = demo_app(&fake).await;

    let published = app
        .publish(true, &CancellationToken::new())
        .await
        .expect("publish should succeed");

    assert!(published);
    let publish = fake
        .requests()
        .into_iter()
        .find(|request| request.api_path() == "apps/app-1/publish")
        .expect("publish request recorded");
    assert_eq!(publish.body_json(), json!({"versionId": "0.1", "isStaging": true}));
}

#[tokio::test]
async fn spelling_key_is_registered_as_a_bing_external_key() {
    let fake = FakeLuis::new();
    let app = demo_app(&fake).await;

    app.add_spelling("bing-123", &CancellationToken::new())
        .await
        .expect("key should be accepted");

    let request = fake
        .requests()
        .into_iter()
        .find(|request| request.api_path() == "apps/app-1/versions/0.1/externalKeys")
        .expect("external key request recorded");
    assert_eq!(request.method, HttpMethod::Put);
    assert_eq!(
        request.body_json(),
        json!({"type": "BingSpellCheck", "value": "bing-123"})
    );
}

// =============================================================================
// Intents and Phrase Lists
// =============================================================================

#[tokio::test]
async fn intent_lookup_is_case_sensitive() {
    let fake = FakeLuis::new();
    fake.add_intent("i-1", "BookFlight");
    let app = demo_app(&fake).await;
    let cancel = CancellationToken::new();

    let exact = app.intent_id("BookFlight", &cancel).await.expect("lookup");
    let folded = app.intent_id("bookflight", &cancel).await.expect("lookup");

    assert_eq!(exact.as_deref(), Some("i-1"));
    assert_eq!(folded, None);
}

#[tokio::test]
async fn deleting_an_intent_with_different_case_is_a_successful_no_op() {
    let fake = FakeLuis::new();
    fake.add_intent("i-1", "BookFlight");
    let app = demo_app(&fake).await;

    let deleted = app
        .delete_intent("BOOKFLIGHT", &CancellationToken::new())
        .await
        .expect("delete should succeed");

    assert!(deleted);
    assert_eq!(fake.intent_names(), vec!["BookFlight"]);
    assert_eq!(fake.requests_to(HttpMethod::Delete, "apps/app-1/versions/0.1/intents/i-1"), 0);
}

#[tokio::test]
async fn created_intents_can_be_found_and_deleted() {
    let fake = FakeLuis::new();
    let app = demo_app(&fake).await;
    let cancel = CancellationToken::new();

    assert!(app.create_intent("Greet", &cancel).await.expect("create"));
    assert!(app.delete_intent("Greet", &cancel).await.expect("delete"));

    assert!(fake.intent_names().is_empty());
}

#[tokio::test]
async fn phrase_lists_are_matched_by_exact_name() {
    // Given: Phrase lists with numeric ids
    let fake = FakeLuis::new();
    fake.add_phrase_list(4, "Cities");
    fake.add_phrase_list(5, "Airports");
    let app = demo_app(&fake).await;
    let cancel = CancellationToken::new();

    // When: They are looked up and one is deleted
    let airports = app.phrase_list_id("Airports", &cancel).await.expect("lookup");
    let cities_folded = app.phrase_list_id("cities", &cancel).await.expect("lookup");
    let deleted = app.delete_phrase_list("Airports", &cancel).await.expect("delete");

    // Then: Only the exact name matched
    assert_eq!(airports.as_deref(), Some("5"));
    assert_eq!(cities_folded, None);
    assert!(deleted);
    assert_eq!(fake.phrase_list_names(), vec!["Cities"]);
}

#[tokio::test]
async fn created_phrase_list_shows_up_in_the_listing() {
    let fake = FakeLuis::new();
    let app = demo_app(&fake).await;
    let cancel = CancellationToken::new();

    let created = app
        .create_phrase_list(
            &json!({"name": "Colors", "phrases": "red,green", "isExchangeable": true}),
            &cancel,
        )
        .await
        .expect("create");
    let lists = app.phrase_lists(None, &cancel).collect_all().await.expect("list");

    assert!(created);
    assert_eq!(lists.len(), 1);
    assert_eq!(lists[0]["name"], "Colors");
}

#[tokio::test]
async fn closed_list_creation_returns_the_new_id() {
    let fake = FakeLuis::new();
    let app = demo_app(&fake).await;

    let id = app
        .create_closed_list(&json!({"name": "Sizes", "subLists": []}), &CancellationToken::new())
        .await
        .expect("create");

    assert_eq!(id.as_deref(), Some("closed-1"));
}

// =============================================================================
// Utterances, Export and Query
// =============================================================================

#[tokio::test]
async fn utterances_can_be_filtered_by_intent_across_pages() {
    let fake = FakeLuis::new();
    fake.set_page_limit(2);
    fake.add_example(1, "book a flight", "BookFlight");
    fake.add_example(2, "hello", "Greet");
    fake.add_example(3, "fly me to rome", "BookFlight");
    fake.add_example(4, "cancel", "None");
    fake.add_example(5, "hi there", "Greet");
    let app = demo_app(&fake).await;

    let matched = app
        .utterances_for_intents(["BookFlight", "Greet"], &CancellationToken::new())
        .await
        .expect("listing should succeed");

    let texts: Vec<&str> = matched
        .iter()
        .filter_map(|utterance| utterance["text"].as_str())
        .collect();
    assert_eq!(texts, vec!["book a flight", "hello", "fly me to rome", "hi there"]);
}

#[tokio::test]
async fn utterance_batches_report_per_item_results() {
    let fake = FakeLuis::new();
    let app = demo_app(&fake).await;
    let cancel = CancellationToken::new();

    let results = app
        .upload_utterances(
            &json!([
                {"text": "hello", "intentName": "Greet"},
                {"text": "bye", "intentName": "Leave"}
            ]),
            &cancel,
        )
        .await
        .expect("upload");
    let single = app
        .upload_utterance(&json!({"text": "yo", "intentName": "Greet"}), &cancel)
        .await
        .expect("upload");
    let removed = app.delete_utterance("99", &cancel).await.expect("delete");

    assert_eq!(results.map(|items| items.len()), Some(2));
    assert!(single);
    assert!(!removed);
}

#[tokio::test]
async fn export_returns_the_model_document() {
    let fake = FakeLuis::new();
    fake.add_intent("i-1", "Greet");
    let app = demo_app(&fake).await;

    let exported = app
        .download(&CancellationToken::new())
        .await
        .expect("export should succeed")
        .expect("export should have a body");

    assert_eq!(exported["name"], "Exported");
    assert_eq!(exported["intents"][0]["name"], "Greet");
}

#[tokio::test]
async fn query_goes_to_the_prediction_endpoint_with_encoded_text() {
    // Given: A published application
    let fake = FakeLuis::new();
    let app = demo_app(&fake).await;

    // When: A query with spaces and punctuation is run
    let prediction = app
        .query("book a flight?", QueryOptions::default(), &CancellationToken::new())
        .await
        .expect("query should succeed")
        .expect("prediction should have a body");

    // Then: The prediction URI carries the key, the encoded text and the flags
    assert_eq!(prediction["query"], "book a flight?");
    let request = fake.requests().pop().expect("query request recorded");
    assert_eq!(
        request.url,
        "https://fake.test/luis/v2.0/apps/app-1?subscription-key=test-key\
         &q=book%20a%20flight%3F&log=true&spellCheck=false&verbose=false"
    );
}

#[tokio::test]
async fn page_size_from_config_is_sent_as_take() {
    let fake = FakeLuis::new();
    fake.add_app("app-1", "Demo");
    let config = luis_core::SubscriptionConfig::new(luis_tests::DOMAIN, luis_tests::KEY)
        .with_page_size(Some(50));
    let subscription = luis_core::Subscription::with_http_client(config, fake.clone())
        .expect("valid config");
    let app = subscription
        .application("app-1", &CancellationToken::new())
        .await
        .expect("fetch")
        .expect("application should exist");

    app.intents(None, &CancellationToken::new())
        .collect_all()
        .await
        .expect("listing");

    let listing = fake.requests().pop().expect("listing request recorded");
    assert!(listing.url.ends_with("apps/app-1/versions/0.1/intents?skip=0&take=50"));
}
