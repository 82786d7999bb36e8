//! Loading configuration files and registering their states.

use std::fs;

use statenav::config::{flatten, load_config, register_all, ConfigError};
use statenav::{AddressMode, InterceptorMode, StateRegistry};

mod common;

#[test]
fn test_load_shop_config_from_disk() {
    let path = std::env::temp_dir().join(format!("statenav-{}.toml", std::process::id()));
    fs::write(&path, common::SHOP_CONFIG).unwrap();
    let config = load_config(&path).unwrap();
    fs::remove_file(&path).ok();

    assert_eq!(config.observability.log_level, "debug");
    assert_eq!(config.address.mode, AddressMode::Path);

    let names: Vec<_> = flatten(&config).into_iter().map(|s| s.name).collect();
    assert_eq!(
        names,
        vec!["home", "shop", "shop.index", "shop.show", "shop.search", "about"]
    );
}

#[test]
fn test_registered_routes_follow_priority() {
    let registry = common::shop_registry();
    let patterns: Vec<_> = registry
        .routes()
        .iter()
        .map(|r| r.pattern().to_string())
        .collect();
    assert_eq!(patterns, vec!["/", "/shop", "/shop/{id}", "/shop/{query}"]);
    assert!(registry.is_registered("about"));
    assert!(registry.route_for("about").is_none());
}

#[test]
fn test_registration_options_from_config() {
    let config = statenav::config::parse_config(
        r#"
        [states.checkout]
        pattern = "/checkout"
        [states.checkout.options]
        replace = true
        silent = true
        interceptors = "reset"
        "#,
    )
    .unwrap();
    let registry = StateRegistry::new();
    register_all(&registry, &config).unwrap();

    let (_, registration) = registry
        .registered()
        .into_iter()
        .find(|(name, _)| name == "checkout")
        .unwrap();
    assert_eq!(registration.options.replace, Some(true));
    assert_eq!(registration.options.silent, Some(true));
    assert_eq!(registration.options.interceptors, Some(InterceptorMode::Reset));
}

#[test]
fn test_registering_twice_fails() {
    let config = statenav::config::parse_config(common::SHOP_CONFIG).unwrap();
    let registry = StateRegistry::new();
    register_all(&registry, &config).unwrap();
    let err = register_all(&registry, &config).unwrap_err();
    assert!(matches!(err, ConfigError::Registry(_)));
}
