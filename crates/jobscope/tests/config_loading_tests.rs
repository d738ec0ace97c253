//! Table-driven tests for configuration loading and validation.

use jobscope::config::load_config_from_str;

/// Represents a single config loading test case.
struct ConfigTestCase {
    /// Test case name for identification.
    name: &'static str,
    /// The config JSON content to test.
    config_json: &'static str,
    /// Whether loading should succeed.
    should_succeed: bool,
    /// Expected error substring (if should_succeed is false).
    expected_error: Option<&'static str>,
}

const JSON_CONFIG_TESTS: &[ConfigTestCase] = &[
    ConfigTestCase {
        name: "empty_object",
        config_json: "{}",
        should_succeed: true,
        expected_error: None,
    },
    ConfigTestCase {
        name: "valid_full",
        config_json: r#"{
            "database_path": "/data/jobs.db",
            "output_directory": "/data/extracted",
            "save_artifacts": true,
            "logging": { "level": "jobscope=debug", "format": "json" },
            "providers": {
                "default_provider": "ollama",
                "ollama": { "base_url": "http://gpu:11434", "model": "llama3.1:8b", "timeout_secs": 300 },
                "perplexity": { "base_url": "https://api.perplexity.ai", "model": "sonar", "timeout_secs": 30 }
            },
            "analytics": { "top_skills": 20, "skills_per_status": 3, "focus_locations": 5,
                           "list_page_size": 50, "skill_pairs": 10, "top_titles": 5 }
        }"#,
        should_succeed: true,
        expected_error: None,
    },
    ConfigTestCase {
        name: "unknown_provider",
        config_json: r#"{ "providers": { "default_provider": "openai" } }"#,
        should_succeed: false,
        expected_error: Some("unknown variant"),
    },
    ConfigTestCase {
        name: "unknown_log_format",
        config_json: r#"{ "logging": { "format": "yaml" } }"#,
        should_succeed: false,
        expected_error: Some("unknown variant"),
    },
    ConfigTestCase {
        name: "empty_log_level",
        config_json: r#"{ "logging": { "level": " " } }"#,
        should_succeed: false,
        expected_error: Some("logging.level"),
    },
    ConfigTestCase {
        name: "non_http_base_url",
        config_json: r#"{ "providers": { "ollama": { "base_url": "ftp://host" } } }"#,
        should_succeed: false,
        expected_error: Some("http(s) URL"),
    },
    ConfigTestCase {
        name: "empty_model",
        config_json: r#"{ "providers": { "perplexity": { "model": "" } } }"#,
        should_succeed: false,
        expected_error: Some("providers.perplexity.model"),
    },
    ConfigTestCase {
        name: "zero_timeout",
        config_json: r#"{ "providers": { "perplexity": { "timeout_secs": 0 } } }"#,
        should_succeed: false,
        expected_error: Some("timeout_secs"),
    },
    ConfigTestCase {
        name: "zero_page_size",
        config_json: r#"{ "analytics": { "list_page_size": 0 } }"#,
        should_succeed: false,
        expected_error: Some("analytics.list_page_size"),
    },
    ConfigTestCase {
        name: "empty_database_path",
        config_json: r#"{ "database_path": "" }"#,
        should_succeed: false,
        expected_error: Some("database_path"),
    },
    ConfigTestCase {
        name: "malformed_json",
        config_json: r#"{ "database_path": "#,
        should_succeed: false,
        expected_error: Some("parse"),
    },
];

#[test]
fn test_json_config_table() {
    for case in JSON_CONFIG_TESTS {
        let result = load_config_from_str(case.config_json);
        match (result, case.should_succeed) {
            (Ok(_), true) => {}
            (Err(e), false) => {
                if let Some(expected) = case.expected_error {
                    assert!(
                        e.to_string().contains(expected),
                        "[{}] expected error containing '{}', got '{}'",
                        case.name,
                        expected,
                        e
                    );
                }
            }
            (Ok(_), false) => panic!("[{}] expected failure, got success", case.name),
            (Err(e), true) => panic!("[{}] expected success, got error: {}", case.name, e),
        }
    }
}
