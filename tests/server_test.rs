use project_tools::config::ServerOptions;
use project_tools::server::{is_listed, run_args, status};
use std::path::Path;

const PS: &str = "\
CONTAINER ID   IMAGE          COMMAND                  CREATED         STATUS         PORTS                NAMES
4c01db0b339c   nginx:alpine   \"/docker-entrypoint.…\"   2 minutes ago   Up 2 minutes   0.0.0.0:80->80/tcp   project
9ab3f1d2c4e5   redis          \"docker-entrypoint.s…\"   3 hours ago     Exited (0)                          cache-project
";

#[test]
fn test_run_args() {
    let options = ServerOptions {
        ports: vec!["8080:80".to_string()],
        env: vec!["TZ=UTC".to_string()],
        ..Default::default()
    };
    let projects = vec!["blog".to_string(), "shop".to_string()];

    let args = run_args(Path::new("/srv/sites"), &projects, &options);
    assert_eq!(
        args,
        vec![
            "run",
            "--detach",
            "--publish",
            "8080:80",
            "--name",
            "project",
            "--env",
            "TZ=UTC",
            "--volume",
            "/srv/sites/projects:/usr/share/nginx/html",
            "--volume",
            "/srv/sites/projects/blog/dist:/usr/share/nginx/html/blog",
            "--volume",
            "/srv/sites/projects/shop/dist:/usr/share/nginx/html/shop",
            "--volume",
            "/srv/sites/logs:/var/log/nginx",
            "nginx:alpine",
        ]
    );
}

#[test]
fn test_is_listed() {
    assert!(is_listed(PS, "project"));
    assert!(is_listed(PS, "cache-project"));
    assert!(!is_listed(PS, "proj"));
    assert!(!is_listed(PS, "NAMES"));
    assert!(!is_listed("", "project"));
}

#[test]
#[ignore = "requires docker"]
fn test_status_with_docker() {
    let options = ServerOptions { name: "project-tools-test-missing".to_string(), ..Default::default() };
    assert!(!status(&options).unwrap());
}
