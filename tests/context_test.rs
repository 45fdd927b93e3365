//! Integration tests for Context construction, grounded on
//! `examples/original_source/tests/test_context.py`.

use std::io::Write;

use zrm::{Config, Context};

#[test]
fn context_opens_and_closes_idempotently() {
    let ctx = Context::new(0).expect("open context");
    assert_eq!(ctx.domain_id(), 0);
    assert!(!ctx.is_closed());
    ctx.close().unwrap();
    assert!(ctx.is_closed());
    ctx.close().unwrap(); // idempotent
}

#[test]
fn contexts_on_different_domains_do_not_share_discovery() {
    let ctx_a = Context::new(10).expect("open domain 10");
    let ctx_b = Context::new(11).expect("open domain 11");
    assert_ne!(ctx_a.domain_id(), ctx_b.domain_id());
    ctx_a.close().unwrap();
    ctx_b.close().unwrap();
}

#[test]
fn with_config_honors_explicit_domain_id() {
    let ctx = Context::with_config(Config {
        domain_id: Some(42),
        zenoh_config: None,
    })
    .expect("open with explicit config");
    assert_eq!(ctx.domain_id(), 42);
    ctx.close().unwrap();
}

#[test]
fn session_config_uri_env_var_is_honored() {
    let mut file = tempfile::NamedTempFile::new().expect("create temp config file");
    write!(file, "{{ mode: \"peer\" }}").expect("write config");
    std::env::set_var("ZRM_SESSION_CONFIG_URI", file.path());

    let ctx = Context::new(0).expect("open with ZRM_SESSION_CONFIG_URI set");
    ctx.close().unwrap();

    std::env::remove_var("ZRM_SESSION_CONFIG_URI");
}
