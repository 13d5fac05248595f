use project_tools::prompt::{get_prompter, DefaultPrompter, Prompter};

#[test]
fn test_default_prompter_answers_defaults() {
    let prompter = DefaultPrompter;
    assert_eq!(prompter.input("Repo name", "sites").unwrap(), "sites");
    assert!(prompter.confirm("Create?", true).unwrap());
    assert!(!prompter.confirm("Overwrite?", false).unwrap());
}

#[test]
fn test_assume_yes_never_asks() {
    let prompter = get_prompter(true);
    assert_eq!(prompter.input("Repo name", "sites").unwrap(), "sites");
}

#[test]
#[ignore = "requires interactive input"]
fn test_dialoguer_prompter() {
    let prompter = get_prompter(false);
    assert!(prompter.confirm("Continue?", true).is_ok());
}
