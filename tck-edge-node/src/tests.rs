use super::*;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_default_to_config() {
        let args = Args::try_parse_from(["tck-edge-node"]).unwrap();
        let config = args.apply(EdgeNodeConfig::default());

        assert_eq!(config, EdgeNodeConfig::default());
    }

    #[test]
    fn test_args_override_config() {
        let args = Args::try_parse_from([
            "tck-edge-node",
            "--broker",
            "tcp://broker:1884",
            "--group-id",
            "MyGroup",
            "--edge-node-id",
            "Edge01",
            "--username",
            "admin",
            "--password",
            "changeme",
            "--client-id-prefix",
            "ci",
        ])
        .unwrap();

        let base = EdgeNodeConfig {
            group_id: "FromFile".into(),
            utc_window_ms: 1234,
            ..Default::default()
        };
        let config = args.apply(base);

        assert_eq!(config.broker_url, "tcp://broker:1884");
        assert_eq!(config.group_id, "MyGroup");
        assert_eq!(config.edge_node_id, "Edge01");
        assert_eq!(config.credentials(), Some(("admin", "changeme")));
        assert_eq!(config.control_client_id(), "ci_control");
        // Values without a flag are kept
        assert_eq!(config.utc_window_ms, 1234);
    }

    #[test]
    fn test_config_flag() {
        let args = Args::try_parse_from(["tck-edge-node", "-c", "/etc/tck/edge.toml"]).unwrap();
        assert_eq!(args.config, Some(PathBuf::from("/etc/tck/edge.toml")));
    }

    #[test]
    fn test_unknown_argument_rejected() {
        assert!(Args::try_parse_from(["tck-edge-node", "--bogus"]).is_err());
    }
}
