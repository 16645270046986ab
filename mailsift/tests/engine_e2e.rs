// /////////////////////////////////////////////////////////////////////////////
// Mailsift
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Engine End-to-End Tests
//!
//! Drives whole workflow documents through the engine service: serial and
//! parallel composition, failure propagation, execute-one ordering rules,
//! schema cleaning and the recursive tree dump.

use std::sync::Arc;
use std::sync::Once;

use serde_json::{json, Value};

use mailsift::application::services::EngineService;
use mailsift::infrastructure::config::EngineSettings;
use mailsift::{register_builtin_stages, registry};
use mailsift_domain::services::{Stage, StageCore};
use mailsift_domain::{
    AttributeValue, Email, EngineError, StageState, StoreView, ATTR_FILE_BYTES,
};

/// Counts how often each email is visited, for exactly-once assertions.
struct CountingStage {
    core: StageCore,
}

impl CountingStage {
    const PLUGIN_NAME: &'static str = "TestCounter";

    fn create(instance_id: &str) -> Arc<dyn Stage> {
        let schema = json!({
            "$schema": "https://json-schema.org/draft/2020-12/schema",
            "type": "object",
            "additionalProperties": false
        });
        let core = StageCore::new(Self::PLUGIN_NAME, instance_id, schema);
        core.transition_to(StageState::Loaded);
        Arc::new(Self { core })
    }
}

impl Stage for CountingStage {
    fn core(&self) -> &StageCore {
        &self.core
    }

    fn execute(&self, view: &mut StoreView<'_>) -> Result<(), EngineError> {
        self.core.transition_to(StageState::Running);
        view.for_each_mut(|email| {
            let visits = match email.attribute("visits") {
                Some(AttributeValue::Integer(count)) => *count,
                _ => 0,
            };
            email.insert_attribute("visits", AttributeValue::Integer(visits + 1));
        });
        self.core.transition_to(StageState::Complete);
        Ok(())
    }
}

/// A stage whose schema carries a private `_inlook_` hint that is not a
/// valid subschema; it must validate only because cleaning removes it.
struct HintedStage {
    core: StageCore,
}

impl HintedStage {
    const PLUGIN_NAME: &'static str = "TestHinted";

    fn create(instance_id: &str) -> Arc<dyn Stage> {
        let schema = json!({
            "$schema": "https://json-schema.org/draft/2020-12/schema",
            "type": "object",
            "properties": {
                "_inlook_check": 12
            },
            "additionalProperties": true
        });
        let core = StageCore::new(Self::PLUGIN_NAME, instance_id, schema);
        core.transition_to(StageState::Loaded);
        Arc::new(Self { core })
    }
}

impl Stage for HintedStage {
    fn core(&self) -> &StageCore {
        &self.core
    }

    fn execute(&self, _view: &mut StoreView<'_>) -> Result<(), EngineError> {
        self.core.transition_to(StageState::Running);
        self.core.transition_to(StageState::Complete);
        Ok(())
    }
}

/// Same content as [`HintedStage`] but without the `_inlook_` prefix, so
/// the bogus entry reaches the validator.
struct UnhintedStage {
    core: StageCore,
}

impl UnhintedStage {
    const PLUGIN_NAME: &'static str = "TestUnhinted";

    fn create(instance_id: &str) -> Arc<dyn Stage> {
        let schema = json!({
            "$schema": "https://json-schema.org/draft/2020-12/schema",
            "type": "object",
            "properties": {
                "inlook_check": 12
            },
            "additionalProperties": true
        });
        let core = StageCore::new(Self::PLUGIN_NAME, instance_id, schema);
        core.transition_to(StageState::Loaded);
        Arc::new(Self { core })
    }
}

impl Stage for UnhintedStage {
    fn core(&self) -> &StageCore {
        &self.core
    }

    fn execute(&self, _view: &mut StoreView<'_>) -> Result<(), EngineError> {
        self.core.transition_to(StageState::Running);
        self.core.transition_to(StageState::Complete);
        Ok(())
    }
}

static TEST_STAGES: Once = Once::new();

fn setup() {
    register_builtin_stages();
    TEST_STAGES.call_once(|| {
        registry().register(CountingStage::PLUGIN_NAME, CountingStage::create);
        registry().register(HintedStage::PLUGIN_NAME, HintedStage::create);
        registry().register(UnhintedStage::PLUGIN_NAME, UnhintedStage::create);
    });
}

fn email_from_bytes(bytes: &[u8]) -> Email {
    let mut email = Email::new();
    email.insert_attribute(ATTR_FILE_BYTES, AttributeValue::CharVector(bytes.to_vec()));
    email.finalize().unwrap();
    email
}

fn service_with_emails(count: usize) -> EngineService {
    let service = EngineService::new(EngineSettings::default());
    for index in 0..count {
        service
            .store()
            .insert(email_from_bytes(format!("email {}", index).as_bytes()));
    }
    service
}

fn assert_subtree_complete(node: &Value) {
    assert_eq!(node["state"], "COMPLETE", "node {} not complete", node["instanceID"]);
    for child in node["children"].as_array().unwrap() {
        assert_subtree_complete(child);
    }
}

#[test]
fn serial_add_then_ensure_succeeds() {
    setup();
    let service = service_with_emails(1);
    let workflow = json!({
        "name": "Serial",
        "options": {
            "plugins": [
                {"name": "AddAttr", "options": {"attributes": [{"attributeKey": "k", "attributeVal": "v"}]}},
                {"name": "EnsureAttr", "options": {"key": "k", "val": "v"}}
            ]
        }
    });
    service.initialize_root(&workflow).unwrap();
    service.instantiate().unwrap();
    assert!(service.execute().is_ok());
    assert_eq!(service.root_state(), Some(StageState::Complete));
    assert_subtree_complete(&service.tree_json());
}

#[test]
fn serial_ensure_without_add_fails_with_child_failed() {
    setup();
    let service = service_with_emails(1);
    let workflow = json!({
        "name": "Serial",
        "options": {
            "plugins": [
                {"name": "EnsureAttr", "options": {"key": "k", "val": "v"}}
            ]
        }
    });
    service.initialize_root(&workflow).unwrap();
    service.instantiate().unwrap();
    let err = service.execute().unwrap_err();
    assert!(matches!(err, EngineError::ChildFailed(_)));
    assert_eq!(service.root_state(), Some(StageState::Failed));
}

#[test]
fn parallel_visits_every_email_exactly_once() {
    setup();
    let service = service_with_emails(10);
    let workflow = json!({
        "name": "Parallel",
        "options": {
            "plugin": [
                {"name": "TestCounter", "options": {}}
            ],
            "num_threads": 4
        }
    });
    service.initialize_root(&workflow).unwrap();
    service.instantiate().unwrap();
    assert!(service.execute().is_ok());
    assert_eq!(service.store().len(), 10);

    let mut visited_once = 0;
    service.store().full_view().for_each(|email| {
        assert_eq!(email.attribute("visits"), Some(&AttributeValue::Integer(1)));
        visited_once += 1;
    });
    assert_eq!(visited_once, 10);
}

#[test]
fn parallel_accepts_plugins_alias() {
    setup();
    let service = service_with_emails(4);
    let workflow = json!({
        "name": "Parallel",
        "options": {
            "plugins": [
                {"name": "TestCounter", "options": {}}
            ],
            "num_threads": 2
        }
    });
    service.initialize_root(&workflow).unwrap();
    service.instantiate().unwrap();
    assert!(service.execute().is_ok());
    service.store().full_view().for_each(|email| {
        assert_eq!(email.attribute("visits"), Some(&AttributeValue::Integer(1)));
    });
}

#[test]
fn unknown_stage_name_fails_instantiation() {
    setup();
    let service = service_with_emails(0);
    let workflow = json!({
        "name": "Serial",
        "options": {"plugins": [{"name": "NoSuchStage"}]}
    });
    service.initialize_root(&workflow).unwrap();
    // The registry miss is an UnknownPlugin at the serial executor and is
    // wrapped as ChildFailed on the way up through the root.
    let err = service.instantiate().unwrap_err();
    assert!(matches!(
        &err,
        EngineError::ChildFailed(message) if message.contains("NoSuchStage")
    ));
}

#[test]
fn workflow_rejected_by_root_schema_is_config_invalid() {
    setup();
    let service = service_with_emails(0);
    // `options` is required by the root schema
    let workflow = json!({"name": "Serial"});
    service.initialize_root(&workflow).unwrap();
    let err = service.instantiate().unwrap_err();
    assert!(matches!(err, EngineError::ConfigInvalid(_)));
    assert_eq!(service.root_state(), Some(StageState::Failed));
}

#[test]
fn schema_cleaning_spares_private_hints_only() {
    setup();
    let hinted = registry()
        .create_instance(HintedStage::PLUGIN_NAME, &json!({}))
        .unwrap();
    assert!(hinted.stage().instantiate_recursive().is_ok());

    let unhinted = registry()
        .create_instance(UnhintedStage::PLUGIN_NAME, &json!({}))
        .unwrap();
    let err = unhinted.stage().instantiate_recursive().unwrap_err();
    assert!(matches!(err, EngineError::ConfigInvalid(_)));
    assert_eq!(unhinted.core().state(), StageState::Failed);
}

#[test]
fn tree_dump_reports_ids_states_and_children_in_order() {
    setup();
    let service = service_with_emails(1);
    let workflow = json!({
        "name": "Serial",
        "options": {
            "plugins": [
                {"name": "AddAttr", "options": {"attributes": []}},
                {"name": "AttrLogger"}
            ]
        }
    });
    service.initialize_root(&workflow).unwrap();
    service.instantiate().unwrap();
    assert!(service.execute().is_ok());

    let tree = service.tree_json();
    assert_eq!(tree["createFunc"], "Root");
    assert!(tree["instanceID"].as_str().unwrap().starts_with("Root_"));
    let serial = &tree["children"][0];
    assert_eq!(serial["createFunc"], "Serial");
    let leaves = serial["children"].as_array().unwrap();
    assert_eq!(leaves.len(), 2);
    assert_eq!(leaves[0]["createFunc"], "AddAttr");
    assert_eq!(leaves[1]["createFunc"], "AttrLogger");
    for leaf in leaves {
        assert_eq!(leaf["state"], "COMPLETE");
        assert!(leaf["schema"].is_object());
        assert!(leaf["config"].is_object());
    }
}

#[test]
fn execute_one_refuses_until_prior_children_complete() {
    setup();
    register_builtin_stages();
    let workflow_options = json!({
        "plugins": [
            {"name": "TestCounter", "options": {}},
            {"name": "TestCounter", "options": {}}
        ]
    });
    let serial = registry().create_instance("Serial", &workflow_options).unwrap();
    serial.stage().instantiate_recursive().unwrap();
    let executor = serial.stage().as_executor().unwrap();
    let ids = executor.child_ids();
    assert_eq!(ids.len(), 2);

    let store = mailsift_domain::EmailStore::new();
    store.insert(email_from_bytes(b"one"));

    // Second child refused while the first is still READY.
    let mut view = store.full_view();
    executor.execute_one(&mut view, &ids[1]).unwrap();
    assert_eq!(executor.child_state(&ids[1]), Some(StageState::Ready));
    drop(view);

    // First child runs, then the second is allowed.
    let mut view = store.full_view();
    executor.execute_one(&mut view, &ids[0]).unwrap();
    assert_eq!(executor.child_state(&ids[0]), Some(StageState::Complete));
    executor.execute_one(&mut view, &ids[1]).unwrap();
    assert_eq!(executor.child_state(&ids[1]), Some(StageState::Complete));
    drop(view);

    let mut total_visits = 0;
    store.full_view().for_each(|email| {
        if let Some(AttributeValue::Integer(count)) = email.attribute("visits") {
            total_visits += count;
        }
    });
    assert_eq!(total_visits, 2);
}

#[test]
fn clear_children_resets_root_to_loaded() {
    setup();
    let service = service_with_emails(1);
    let workflow = json!({
        "name": "Serial",
        "options": {"plugins": [{"name": "AttrLogger"}]}
    });
    service.initialize_root(&workflow).unwrap();
    service.instantiate().unwrap();
    assert!(service.execute().is_ok());

    service.clear_root();
    assert_eq!(service.root_state(), Some(StageState::Loaded));
    let tree = service.tree_json();
    assert_eq!(tree["children"].as_array().unwrap().len(), 0);
}

#[test]
fn run_workflow_loads_a_directory_through_the_loader() {
    setup();
    let corpus = tempfile::tempdir().unwrap();
    std::fs::write(corpus.path().join("a.eml"), b"From: a@b\r\n\r\nfirst").unwrap();
    std::fs::write(corpus.path().join("b.eml"), b"From: c@d\r\n\r\nsecond").unwrap();

    let workflow = json!({
        "name": "Serial",
        "options": {
            "plugins": [
                {"name": "EmailLoader", "options": {"emailPath": corpus.path().to_string_lossy()}}
            ]
        }
    });
    let outcome = mailsift::run_workflow(EngineSettings::default(), workflow).unwrap();
    assert!(outcome.success);
    assert_eq!(outcome.emails, 2);
    assert_eq!(outcome.tree["createFunc"], "Root");
}

#[test]
fn executor_child_management_surface() {
    setup();
    let serial = registry()
        .create_instance(
            "Serial",
            &json!({"plugins": [{"name": "AddAttr", "options": {"attributes": []}}]}),
        )
        .unwrap();
    serial.stage().instantiate_recursive().unwrap();
    let executor = serial.stage().as_executor().unwrap();

    let ids = executor.child_ids();
    assert_eq!(ids.len(), 1);
    assert_eq!(executor.child_state(&ids[0]), Some(StageState::Ready));
    assert_eq!(
        executor.child_config(&ids[0]),
        Some(json!({"attributes": []}))
    );

    let new_options = json!({"attributes": [{"attributeKey": "a", "attributeVal": "b"}]});
    executor.update_child_config(&ids[0], &new_options);
    assert_eq!(executor.child_config(&ids[0]), Some(new_options));

    executor.remove_child(&ids[0]);
    assert!(executor.child_ids().is_empty());
    assert!(executor.child_by_id(&ids[0]).is_none());
    // The dropped handle also vanishes from the registry's instance table.
    assert_eq!(registry().plugin_for_instance(&ids[0]), None);
}
