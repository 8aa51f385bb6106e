use bouncer::config::Config;

#[test]
fn test_config_default_address() {
    // When BOUNCER_LISTEN is not set, should use the default port
    unsafe {
        std::env::remove_var("BOUNCER_LISTEN");
    }
    let cfg = Config::load();
    assert_eq!(cfg.listen_addr, "127.0.0.1:10025");
}

#[test]
fn test_config_default_hostname() {
    unsafe {
        std::env::remove_var("BOUNCER_HOSTNAME");
    }
    let cfg = Config::load();
    assert_eq!(cfg.hostname, "localhost.localdomain");
}

#[test]
fn test_config_max_connections_from_env() {
    unsafe {
        std::env::set_var("BOUNCER_MAX_CONNECTIONS", "64");
    }
    let cfg = Config::load();
    assert_eq!(cfg.max_connections, 64);
    unsafe {
        std::env::remove_var("BOUNCER_MAX_CONNECTIONS");
    }
}

#[test]
fn test_config_clone() {
    let cfg1 = Config::load();
    let cfg2 = cfg1.clone();
    assert_eq!(cfg1.listen_addr, cfg2.listen_addr);
    assert_eq!(cfg1.max_connections, cfg2.max_connections);
}
