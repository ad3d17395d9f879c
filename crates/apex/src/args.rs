//! Builds the argument vector exposed to running programs as `@args`.
//!
//! Grounded in `original_source/main.c`'s `main()`: the script path (its
//! `argv[1]`) occupies index 0, followed by whatever trailing arguments were
//! given on the command line (spec.md §6: "the program path occupies index 0").

/// Returns `script_path` followed by `trailing`, in the order `@args` wants them.
#[must_use]
pub fn program_args(script_path: &str, trailing: &[String]) -> Vec<String> {
    let mut args = Vec::with_capacity(trailing.len() + 1);
    args.push(script_path.to_owned());
    args.extend(trailing.iter().cloned());
    args
}

#[cfg(test)]
mod tests {
    use super::program_args;

    #[test]
    fn program_path_occupies_index_zero() {
        let args = program_args("script.ap", &["one".to_owned(), "two".to_owned()]);
        assert_eq!(args, vec!["script.ap", "one", "two"]);
    }

    #[test]
    fn no_trailing_args_is_just_the_path() {
        let args = program_args("script.ap", &[]);
        assert_eq!(args, vec!["script.ap"]);
    }
}
