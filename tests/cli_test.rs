//! CLI integration tests for the openapi-graph binary.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

fn cmd() -> Command {
    Command::new(assert_cmd::cargo::cargo_bin!("openapi-graph"))
}

// Helper to create a temp document file
fn write_temp_file(dir: &TempDir, name: &str, content: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).unwrap();
    path
}

const PETS_YAML: &str = r#"openapi: 3.0.0
info:
  title: Pets
  version: 1.0.0
paths:
  /pets:
    get:
      operationId: listPets
      summary: List all pets
      responses:
        '200':
          description: ok
          content:
            application/json:
              schema:
                $ref: '#/components/schemas/Pet'
    post:
      responses:
        '201': created
components:
  schemas:
    Pet:
      type: object
      required: [id]
      properties:
        id: { type: integer }
        name: { type: string }
"#;

mod endpoints_command {
    use super::*;

    #[test]
    fn lists_operations() {
        let dir = TempDir::new().unwrap();
        let doc = write_temp_file(&dir, "pets.yaml", PETS_YAML);

        cmd()
            .args(["endpoints", doc.to_str().unwrap()])
            .assert()
            .success()
            .stdout(predicate::str::contains("Pets 1.0.0 (OpenAPI 3.0.0)"))
            .stdout(predicate::str::contains("GET     /pets [list_pets]  List all pets"))
            .stdout(predicate::str::contains("POST    /pets [post_pets]"));
    }

    #[test]
    fn json_output() {
        let dir = TempDir::new().unwrap();
        let doc = write_temp_file(&dir, "pets.yaml", PETS_YAML);

        cmd()
            .args(["endpoints", doc.to_str().unwrap(), "--json"])
            .assert()
            .success()
            .stdout(predicate::str::contains(r#""specVersionLabel": "OpenAPI 3.0.0""#))
            .stdout(predicate::str::contains(r#""statusCode": "200""#));
    }

    #[test]
    fn missing_file_is_io_error() {
        cmd()
            .args(["endpoints", "/nonexistent/pets.yaml"])
            .assert()
            .code(3)
            .stderr(predicate::str::contains("file not found"));
    }

    #[test]
    fn unparseable_file_is_parse_error() {
        let dir = TempDir::new().unwrap();
        let doc = write_temp_file(&dir, "broken.json", r#"{"openapi": "3.0.0", "paths": ["#);

        cmd()
            .args(["endpoints", doc.to_str().unwrap()])
            .assert()
            .code(2);
    }

    #[test]
    fn dangling_reference_is_explained() {
        let dir = TempDir::new().unwrap();
        let doc = write_temp_file(
            &dir,
            "dangling.json",
            r##"{
                "openapi": "3.0.0",
                "info": { "title": "t", "version": "1" },
                "paths": { "/a": { "get": { "responses": { "200": {
                    "description": "ok",
                    "content": { "application/json": { "schema": { "$ref": "#/components/schemas/Ghost" } } }
                } } } } }
            }"##,
        );

        cmd()
            .args(["endpoints", doc.to_str().unwrap()])
            .assert()
            .code(2)
            .stderr(predicate::str::contains("Reference error"))
            .stderr(predicate::str::contains("#/components/schemas/Ghost"));
    }
}

mod graph_command {
    use super::*;

    #[test]
    fn collapsed_graph() {
        let dir = TempDir::new().unwrap();
        let doc = write_temp_file(&dir, "pets.yaml", PETS_YAML);

        cmd()
            .args(["graph", doc.to_str().unwrap()])
            .assert()
            .success()
            .stdout(predicate::str::contains(r#""id":"api-root""#))
            .stdout(predicate::str::contains(r#""id":"api-root-list_pets""#))
            .stdout(predicate::str::contains("api-root-list_pets-200").not());
    }

    #[test]
    fn expand_in_order() {
        let dir = TempDir::new().unwrap();
        let doc = write_temp_file(&dir, "pets.yaml", PETS_YAML);

        cmd()
            .args([
                "graph",
                doc.to_str().unwrap(),
                "--expand",
                "api-root-list_pets",
                "--expand",
                "api-root-list_pets-200",
            ])
            .assert()
            .success()
            .stdout(predicate::str::contains(r#""label":"id*: integer""#))
            .stdout(predicate::str::contains(r#""label":"name: string""#));
    }

    #[test]
    fn unknown_node_warns() {
        let dir = TempDir::new().unwrap();
        let doc = write_temp_file(&dir, "pets.yaml", PETS_YAML);

        cmd()
            .args(["graph", doc.to_str().unwrap(), "--expand", "api-root-nope"])
            .assert()
            .success()
            .stderr(predicate::str::contains("not expandable: api-root-nope"));
    }

    #[test]
    fn expand_all() {
        let dir = TempDir::new().unwrap();
        let doc = write_temp_file(&dir, "pets.yaml", PETS_YAML);

        cmd()
            .args(["graph", doc.to_str().unwrap(), "--expand-all", "--pretty"])
            .assert()
            .success()
            .stdout(predicate::str::contains("\"api-root-list_pets-200-schema-name\""));
    }
}

mod resolve_command {
    use super::*;

    #[test]
    fn inlines_references() {
        let dir = TempDir::new().unwrap();
        let doc = write_temp_file(&dir, "pets.yaml", PETS_YAML);

        cmd()
            .args(["resolve", doc.to_str().unwrap()])
            .assert()
            .success()
            .stdout(predicate::str::contains("$ref").not())
            .stdout(predicate::str::contains(r#""required": ["#));
    }

    #[test]
    fn yaml_output_file() {
        let dir = TempDir::new().unwrap();
        let doc = write_temp_file(&dir, "pets.yaml", PETS_YAML);
        let out = dir.path().join("resolved.yaml");

        cmd()
            .args([
                "resolve",
                doc.to_str().unwrap(),
                "--yaml",
                "--output",
                out.to_str().unwrap(),
            ])
            .assert()
            .success();

        let content = fs::read_to_string(&out).unwrap();
        assert!(content.contains("openapi: 3.0.0"));
        assert!(!content.contains("$ref"));
    }
}

mod explain_command {
    use super::*;

    #[test]
    fn classifies_type_errors() {
        cmd()
            .args(["explain", "instance.paths is not of a type(s) object"])
            .assert()
            .success()
            .stdout(predicate::str::contains("[type-error] Type mismatch"))
            .stdout(predicate::str::contains("expected object"));
    }

    #[test]
    fn json_output_is_redacted() {
        cmd()
            .args([
                "explain",
                "--json",
                r#"unexpected token in {"info": {"title": "secret"}}"#,
            ])
            .assert()
            .success()
            .stdout(predicate::str::contains(r#""category":"generic""#))
            .stdout(predicate::str::contains("secret").not());
    }
}

mod lint_command {
    use super::*;

    #[test]
    fn valid_document_passes() {
        let dir = TempDir::new().unwrap();
        write_temp_file(&dir, "pets.yaml", PETS_YAML);

        cmd()
            .args(["lint", dir.path().to_str().unwrap()])
            .assert()
            .success()
            .stdout(predicate::str::contains("1 files checked, all passed"));
    }

    #[test]
    fn missing_info_fails() {
        let dir = TempDir::new().unwrap();
        write_temp_file(&dir, "bad.json", r#"{"openapi": "3.0.0", "paths": {"/a": {"get": {}}}}"#);

        cmd()
            .args(["lint", dir.path().to_str().unwrap()])
            .assert()
            .code(1)
            .stdout(predicate::str::contains("error: info - "));
    }

    #[test]
    fn warnings_fail_in_strict_mode() {
        let dir = TempDir::new().unwrap();
        write_temp_file(
            &dir,
            "empty-paths.yaml",
            "openapi: 3.0.0\ninfo:\n  title: t\n  version: '1'\npaths: {}\n",
        );

        cmd()
            .args(["lint", dir.path().to_str().unwrap()])
            .assert()
            .success();

        cmd()
            .args(["lint", dir.path().to_str().unwrap(), "--strict"])
            .assert()
            .code(1);
    }

    #[test]
    fn json_format() {
        let dir = TempDir::new().unwrap();
        write_temp_file(&dir, "syntax.json", "{ not json");

        cmd()
            .args(["lint", dir.path().to_str().unwrap(), "--format", "json"])
            .assert()
            .code(1)
            .stdout(predicate::str::contains(r#""status": "error""#))
            .stdout(predicate::str::contains("syntax error"));
    }

    #[test]
    fn missing_path() {
        cmd()
            .args(["lint", "/nonexistent/dir"])
            .assert()
            .code(3)
            .stderr(predicate::str::contains("path not found"));
    }
}

mod config {
    use super::*;

    #[test]
    fn invalid_config_file() {
        let dir = TempDir::new().unwrap();
        let config = write_temp_file(&dir, "bad.toml", "[pipeline]\nresolve_timeout_ms = \"later\"\n");

        cmd()
            .args(["--config", config.to_str().unwrap(), "explain", "boom"])
            .assert()
            .code(2)
            .stderr(predicate::str::contains("invalid config"));
    }

    #[test]
    fn layout_from_config_moves_root() {
        let dir = TempDir::new().unwrap();
        let config = write_temp_file(&dir, "layout.toml", "[layout]\norigin_x = 7.0\norigin_y = 9.0\n");
        let doc = write_temp_file(&dir, "pets.yaml", PETS_YAML);

        cmd()
            .args(["graph", doc.to_str().unwrap(), "--config", config.to_str().unwrap()])
            .assert()
            .success()
            .stdout(predicate::str::contains(r#""position":{"x":7.0,"y":9.0}"#));
    }
}
