//! Integration tests for the sql-dummy binary.

use std::fs;
use std::path::PathBuf;
use std::process::Command;
use tempfile::TempDir;

fn get_binary_path() -> String {
    std::env::var("CARGO_BIN_EXE_sql-dummy").unwrap_or_else(|_| "target/debug/sql-dummy".to_string())
}

fn create_schema(dir: &TempDir) -> PathBuf {
    let path = dir.path().join("schema.sql");
    fs::write(
        &path,
        r#"
-- comments come before the tables they reference
CREATE TABLE public.comments (
    id serial PRIMARY KEY,
    post_id integer NOT NULL REFERENCES public.posts(id),
    body text
);

CREATE TABLE public.posts (
    id serial PRIMARY KEY,
    author_id integer NOT NULL,
    title varchar(60) NOT NULL,
    published boolean,
    CONSTRAINT posts_author_fk FOREIGN KEY (author_id) REFERENCES public.users (id)
);

CREATE TABLE public.users (
    id serial PRIMARY KEY,
    email varchar(120) NOT NULL UNIQUE,
    created_at timestamp without time zone NOT NULL
);
"#,
    )
    .unwrap();
    path
}

fn run(args: &[&str]) -> std::process::Output {
    Command::new(get_binary_path())
        .args(args)
        .output()
        .expect("Failed to execute command")
}

#[test]
fn test_generate_dump_to_file() {
    let dir = TempDir::new().unwrap();
    let schema = create_schema(&dir);
    let out = dir.path().join("out.sql");

    let output = run(&[
        "generate",
        "-s",
        schema.to_str().unwrap(),
        "-n",
        "4",
        "--seed",
        "11",
        "-o",
        out.to_str().unwrap(),
    ]);
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));

    let sql = fs::read_to_string(&out).unwrap();
    let users = sql.find("COPY public.users (id,email,created_at) FROM stdin;").unwrap();
    let posts = sql.find("COPY public.posts ").unwrap();
    let comments = sql.find("COPY public.comments ").unwrap();
    assert!(users < posts && posts < comments);

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Generation summary (seed 11)"));
    assert!(stderr.contains("12 rows emitted"));
}

#[test]
fn test_generate_is_reproducible_with_seed() {
    let dir = TempDir::new().unwrap();
    let schema = create_schema(&dir);
    let args = [
        "generate",
        "-s",
        schema.to_str().unwrap(),
        "--seed",
        "99",
        "-f",
        "insert",
        "--no-summary",
    ];

    let first = run(&args);
    let second = run(&args);
    assert!(first.status.success());
    assert!(!first.stdout.is_empty());
    // timestamps hang off the wall clock, so compare everything else
    let strip = |out: &[u8]| -> Vec<String> {
        String::from_utf8_lossy(out)
            .lines()
            .filter(|l| !l.starts_with("INSERT INTO public.users"))
            .map(str::to_string)
            .collect()
    };
    assert_eq!(strip(&first.stdout), strip(&second.stdout));
    assert!(String::from_utf8_lossy(&first.stdout)
        .contains("INSERT INTO public.posts (id,author_id,title,published) VALUES (1,"));
}

#[test]
fn test_generate_table_filter() {
    let dir = TempDir::new().unwrap();
    let schema = create_schema(&dir);

    let output = run(&[
        "generate",
        "-s",
        schema.to_str().unwrap(),
        "-t",
        "posts",
        "--no-summary",
    ]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("COPY public.posts "));
    assert!(!stdout.contains("COPY public.users "));
    assert!(!stdout.contains("COPY public.comments "));
}

#[test]
fn test_generate_with_config_overrides() {
    let dir = TempDir::new().unwrap();
    let schema = create_schema(&dir);
    let config = dir.path().join("dummy.yml");
    fs::write(
        &config,
        r#"
tables:
  users:
    __numrows: 2
  posts:
    __numrows: 3
    title:
      generator: oneof
      items: [hello, world]
"#,
    )
    .unwrap();

    let output = run(&[
        "generate",
        "-s",
        schema.to_str().unwrap(),
        "-c",
        config.to_str().unwrap(),
        "-f",
        "insert",
        "--no-summary",
    ]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(stdout.matches("INSERT INTO public.users ").count(), 2);
    let posts: Vec<&str> = stdout
        .lines()
        .filter(|l| l.starts_with("INSERT INTO public.posts "))
        .collect();
    assert_eq!(posts.len(), 3);
    for line in posts {
        assert!(line.contains("'hello'") || line.contains("'world'"));
    }
}

#[test]
fn test_order_command() {
    let dir = TempDir::new().unwrap();
    let schema = create_schema(&dir);

    let output = run(&["order", "-s", schema.to_str().unwrap()]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines, vec!["public.users", "public.posts", "public.comments"]);
}

#[test]
fn test_config_command_writes_yaml() {
    let dir = TempDir::new().unwrap();
    let schema = create_schema(&dir);
    let out = dir.path().join("generated.yml");

    let output = run(&[
        "config",
        "-s",
        schema.to_str().unwrap(),
        "-o",
        out.to_str().unwrap(),
    ]);
    assert!(output.status.success());

    let yaml = fs::read_to_string(&out).unwrap();
    assert!(yaml.contains("tables:"));
    assert!(yaml.contains("generator: sequence"));
    assert!(yaml.contains("key: users.id"));

    // the written file drives a later run on its own
    let output = run(&[
        "generate",
        "-s",
        schema.to_str().unwrap(),
        "-c",
        out.to_str().unwrap(),
        "--no-summary",
    ]);
    assert!(output.status.success());
}

#[test]
fn test_circular_tables_fail() {
    let dir = TempDir::new().unwrap();
    let schema = dir.path().join("cycle.sql");
    fs::write(
        &schema,
        r#"
CREATE TABLE a (id serial PRIMARY KEY, b_id integer REFERENCES b(id));
CREATE TABLE b (id serial PRIMARY KEY, a_id integer REFERENCES a(id));
"#,
    )
    .unwrap();

    let output = run(&["generate", "-s", schema.to_str().unwrap()]);
    assert!(!output.status.success());
    assert!(!String::from_utf8_lossy(&output.stdout).contains("COPY"));
}

#[test]
fn test_partial_schema_generates() {
    let dir = TempDir::new().unwrap();
    let schema = dir.path().join("partial.sql");
    fs::write(
        &schema,
        "CREATE TABLE posts (id serial PRIMARY KEY, user_id integer NOT NULL REFERENCES users(id));\n",
    )
    .unwrap();

    let output = run(&["generate", "-s", schema.to_str().unwrap(), "-n", "2", "--no-summary"]);
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let stdout = String::from_utf8_lossy(&output.stdout);
    let block: Vec<&str> = stdout
        .lines()
        .skip_while(|l| !l.starts_with("COPY posts (id,user_id) FROM stdin;"))
        .skip(1)
        .take_while(|l| *l != "\\.")
        .collect();
    assert_eq!(block.len(), 2);
    for line in block {
        assert!(!line.ends_with("\\N"));
    }
}

#[test]
fn test_missing_inputs_is_an_error() {
    let output = run(&["generate"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("--schema"));
}

#[test]
fn test_unknown_format_is_an_error() {
    let dir = TempDir::new().unwrap();
    let schema = create_schema(&dir);
    let output = run(&["generate", "-s", schema.to_str().unwrap(), "-f", "csv"]);
    assert!(!output.status.success());
}
