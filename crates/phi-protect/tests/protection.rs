//! End-to-end protection cycle tests.

use phi_access::{AccessLevel, RolePolicy};
use phi_cipher::SecretKey;
use phi_core::{EntityType, SessionId};
use phi_protect::{MemorySink, ProtectionConfig, ProtectionEngine};
use std::sync::Arc;

fn engine() -> ProtectionEngine {
    ProtectionEngine::new(SecretKey::from_passphrase("integration test key"))
}

fn run_cycle(
    engine: &ProtectionEngine,
    config: &ProtectionConfig,
    session: SessionId,
    prompt: &str,
    role: &str,
) -> (String, String) {
    let mut cycle = engine.begin_cycle(session, prompt);
    let protected = engine.protect(&mut cycle, config).unwrap();
    // The external LLM echoes the protected values back.
    engine
        .record_response(&mut cycle, format!("Noted: {protected}"))
        .unwrap();
    let restored = engine.restore(&mut cycle, config, role).unwrap();
    (protected, restored)
}

#[test]
fn test_full_access_round_trip() {
    let engine = engine();
    let config = ProtectionConfig::default();
    let session = SessionId::new();
    let prompt = "For the patient Ramesh Kumar, SSN 123-45-6789, call (555) 123-4567";

    let (protected, restored) = run_cycle(&engine, &config, session, prompt, "doctor");

    // Nothing sensitive leaves in the protected text.
    assert!(!protected.contains("Ramesh Kumar"));
    assert!(!protected.contains("123-45-6789"));
    assert!(!protected.contains("(555) 123-4567"));

    // Full access with decrypt restores every original.
    assert!(restored.contains("Ramesh Kumar"));
    assert!(restored.contains("123-45-6789"));
    assert!(restored.contains("(555) 123-4567"));
}

#[test]
fn test_protected_ssn_preserves_format() {
    let engine = engine();
    let config = ProtectionConfig::default();
    let prompt = "SSN 123-45-6789";

    let mut cycle = engine.begin_cycle(SessionId::new(), prompt);
    let protected = engine.protect(&mut cycle, &config).unwrap();

    let mapping = engine.sessions().session(cycle.session_id());
    let mapping = mapping.lock();
    assert_eq!(mapping.len(), 1);
    let protected_ssn = &mapping.by_length()[0].protected_value;

    assert_eq!(protected_ssn.len(), "123-45-6789".len());
    for (o, p) in "123-45-6789".chars().zip(protected_ssn.chars()) {
        assert_eq!(o.is_ascii_digit(), p.is_ascii_digit());
        if !o.is_ascii_digit() {
            assert_eq!(o, p);
        }
    }
    assert!(protected.contains(protected_ssn.as_str()));
}

#[test]
fn test_determinism_within_session_and_epoch() {
    let engine = engine();
    let config = ProtectionConfig::default();
    let session = SessionId::new();
    let prompt = "SSN 123-45-6789";

    let (first, _) = run_cycle(&engine, &config, session, prompt, "doctor");
    let mut cycle = engine.begin_cycle(session, prompt);
    let second = engine.protect(&mut cycle, &config).unwrap();

    assert_eq!(first, second);
    // Deterministic re-protection does not duplicate mappings.
    assert_eq!(engine.sessions().session(session).lock().len(), 1);
}

#[test]
fn test_person_substitution_stable_and_restorable() {
    let engine = engine();
    let config = ProtectionConfig::default();
    let session = SessionId::new();

    let mut first = engine.begin_cycle(session, "the patient Ramesh Kumar");
    let a = engine.protect(&mut first, &config).unwrap();
    let mut second = engine.begin_cycle(session, "the patient Ramesh Kumar");
    let b = engine.protect(&mut second, &config).unwrap();

    // Same substitute name both times, and never the original.
    assert_eq!(a, b);
    assert!(!a.contains("Ramesh Kumar"));

    engine.record_response(&mut first, a.clone()).unwrap();
    let restored = engine.restore(&mut first, &config, "doctor").unwrap();
    assert!(restored.contains("Ramesh Kumar"));
}

#[test]
fn test_masked_role_sees_fresh_masks() {
    let engine = engine();
    let config = ProtectionConfig::default();
    let session = SessionId::new();
    let prompt = "the patient Ramesh Kumar, email john.doe@company.com, SSN 123-45-6789";

    let (protected, restored) = run_cycle(&engine, &config, session, prompt, "nurse");

    // Nurse: PERSON and EMAIL masked, SSN not in the allow list at all.
    assert!(restored.contains("j***@company.com"));
    assert!(!restored.contains("Ramesh Kumar"));
    assert!(!restored.contains("123-45-6789"));

    // The denied SSN stays in its protected form.
    let session_mappings = engine.sessions().session(session);
    let session_mappings = session_mappings.lock();
    let protected_ssn = session_mappings
        .by_length()
        .into_iter()
        .find(|m| m.entity_type == EntityType::Ssn)
        .unwrap()
        .protected_value
        .clone();
    assert!(protected.contains(&protected_ssn));
    assert!(restored.contains(&protected_ssn));
}

#[test]
fn test_decrypt_gate_yields_literal_masked_ssn() {
    let engine = engine();
    let mut config = ProtectionConfig::default();
    // Full access without decrypt capability: masked output.
    config.role_based_access.insert(
        "auditor",
        RolePolicy {
            phi_access: AccessLevel::Full,
            can_decrypt: false,
            can_generate_pdf: true,
            allowed_entities: vec![EntityType::Ssn],
        },
    );

    let (_, restored) = run_cycle(
        &engine,
        &config,
        SessionId::new(),
        "SSN 123-45-6789",
        "auditor",
    );
    assert!(restored.contains("***-**-6789"));
    assert!(!restored.contains("123-45-6789"));
}

#[test]
fn test_unknown_role_gets_nothing_restored() {
    let engine = engine();
    let config = ProtectionConfig::default();
    let session = SessionId::new();

    let (protected, restored) = run_cycle(
        &engine,
        &config,
        session,
        "SSN 123-45-6789, the patient Ramesh Kumar",
        "stranger",
    );

    assert!(!restored.contains("123-45-6789"));
    assert!(!restored.contains("Ramesh Kumar"));
    // Everything stays exactly as transmitted.
    assert_eq!(restored, format!("Noted: {protected}"));
}

#[test]
fn test_multi_turn_session_restores_earlier_substitutions() {
    let engine = engine();
    let config = ProtectionConfig::default();
    let session = SessionId::new();

    // Turn one protects the SSN.
    let mut first = engine.begin_cycle(session, "SSN 123-45-6789");
    engine.protect(&mut first, &config).unwrap();
    let protected_ssn = {
        let mappings = engine.sessions().session(session);
        let mappings = mappings.lock();
        mappings.by_length()[0].protected_value.clone()
    };

    // Turn two has no PHI of its own, but the response references turn
    // one's protected value.
    let mut second = engine.begin_cycle(session, "what was that number?");
    engine.protect(&mut second, &config).unwrap();
    engine
        .record_response(&mut second, format!("It was {protected_ssn}."))
        .unwrap();
    let restored = engine.restore(&mut second, &config, "doctor").unwrap();

    assert!(restored.contains("123-45-6789"));
}

#[test]
fn test_key_rotation_keeps_old_mappings_restorable() {
    let mut engine = engine();
    let config = ProtectionConfig::default();
    let session = SessionId::new();

    let mut first = engine.begin_cycle(session, "SSN 123-45-6789");
    engine.protect(&mut first, &config).unwrap();

    let old_epoch = engine.active_epoch();
    engine.rotate_keys();
    assert_ne!(engine.active_epoch(), old_epoch);

    let mut second = engine.begin_cycle(session, "SSN 123-45-6789");
    engine.protect(&mut second, &config).unwrap();

    // Two epochs, two distinct protected forms, both restorable.
    let mappings = engine.sessions().session(session);
    let mappings = mappings.lock();
    assert_eq!(mappings.len(), 2);
    let forms: Vec<String> = mappings
        .by_length()
        .iter()
        .map(|m| m.protected_value.clone())
        .collect();
    drop(mappings);
    assert_ne!(forms[0], forms[1]);

    for form in &forms {
        assert_eq!(
            engine.restore_value(session, form).unwrap(),
            "123-45-6789"
        );
    }
}

#[test]
fn test_audit_record_carries_all_four_stages() {
    let mut engine = engine();
    let sink = Arc::new(MemorySink::new());
    engine.add_sink(Box::new(Arc::clone(&sink)));

    let config = ProtectionConfig::default();
    let session = SessionId::new();
    let prompt = "SSN 123-45-6789";

    let mut cycle = engine.begin_cycle(session, prompt);
    let protected = engine.protect(&mut cycle, &config).unwrap();
    let response = format!("Noted: {protected}");
    engine.record_response(&mut cycle, response.clone()).unwrap();
    let restored = engine.restore(&mut cycle, &config, "doctor").unwrap();
    engine.deliver(&mut cycle, &config).unwrap();

    let records = sink.records();
    assert_eq!(records.len(), 1);
    let record = &records[0];

    assert_eq!(record.prompt, prompt);
    assert_eq!(record.original_data.len(), 1);
    assert_eq!(record.original_data[0].value, "123-45-6789");
    assert_eq!(record.after_fpe_before_llm, protected);
    assert_eq!(record.nlp_response, response);
    assert_eq!(record.restored_with_original_data, restored);
    assert_eq!(record.role, "doctor");
}

#[test]
fn test_audit_disabled_emits_nothing() {
    let mut engine = engine();
    let sink = Arc::new(MemorySink::new());
    engine.add_sink(Box::new(Arc::clone(&sink)));

    let mut config = ProtectionConfig::default();
    config.audit_settings.enabled = false;

    let session = SessionId::new();
    let mut cycle = engine.begin_cycle(session, "SSN 123-45-6789");
    engine.protect(&mut cycle, &config).unwrap();
    engine.record_response(&mut cycle, "ok").unwrap();
    engine.restore(&mut cycle, &config, "doctor").unwrap();
    engine.deliver(&mut cycle, &config).unwrap();

    assert!(sink.records().is_empty());
}

#[test]
fn test_unmapped_response_value_left_untouched() {
    let engine = engine();
    let config = ProtectionConfig::default();
    let session = SessionId::new();

    let mut cycle = engine.begin_cycle(session, "no phi in this prompt");
    engine.protect(&mut cycle, &config).unwrap();
    // The response carries a value the session never protected.
    engine
        .record_response(&mut cycle, "try 987-65-4320 instead")
        .unwrap();
    let restored = engine.restore(&mut cycle, &config, "doctor").unwrap();

    assert_eq!(restored, "try 987-65-4320 instead");
}
