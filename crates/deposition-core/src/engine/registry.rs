use super::config::ConfigError;

/// One named entry of a plugin table.
///
/// `default_arguments` stand in when the configuration gives no arguments,
/// and must themselves have `num_arguments` entries.
pub struct Variant<T: ?Sized> {
    pub name: &'static str,
    pub num_arguments: usize,
    pub default_arguments: &'static [f64],
    pub build: fn(&[f64]) -> Result<Box<T>, ConfigError>,
}

pub fn names<T: ?Sized>(table: &[Variant<T>]) -> Vec<&'static str> {
    table.iter().map(|v| v.name).collect()
}

/// Looks `name` up (case-insensitively) in `table` and builds the plugin.
///
/// # Errors
///
/// [`ConfigError::UnknownPlugin`] if no entry matches, and
/// [`ConfigError::ArgumentCount`] if the argument list has the wrong length.
pub fn resolve<T: ?Sized>(
    table: &[Variant<T>],
    kind: &'static str,
    name: &str,
    args: &[f64],
) -> Result<Box<T>, ConfigError> {
    let requested = name.to_ascii_lowercase();
    let variant = table
        .iter()
        .find(|v| v.name == requested)
        .ok_or_else(|| ConfigError::UnknownPlugin {
            kind,
            name: name.to_string(),
            available: names(table).join(", "),
        })?;

    let args = if args.is_empty() {
        variant.default_arguments
    } else {
        args
    };
    if args.len() != variant.num_arguments {
        return Err(ConfigError::ArgumentCount {
            kind,
            name: variant.name.to_string(),
            expected: variant.num_arguments,
            found: args.len(),
        });
    }
    (variant.build)(args)
}

#[cfg(test)]
mod tests {
    use super::*;

    trait Scale {
        fn factor(&self) -> f64;
    }

    struct Constant(f64);

    impl Scale for Constant {
        fn factor(&self) -> f64 {
            self.0
        }
    }

    fn build_constant(args: &[f64]) -> Result<Box<dyn Scale>, ConfigError> {
        Ok(Box::new(Constant(args[0])))
    }

    static TABLE: &[Variant<dyn Scale>] = &[Variant {
        name: "constant",
        num_arguments: 1,
        default_arguments: &[2.0],
        build: build_constant,
    }];

    #[test]
    fn lookup_ignores_case_and_applies_defaults() {
        let built = resolve(TABLE, "scale", "CONSTANT", &[]).unwrap();
        assert_eq!(built.factor(), 2.0);
        let built = resolve(TABLE, "scale", "constant", &[5.0]).unwrap();
        assert_eq!(built.factor(), 5.0);
    }

    #[test]
    fn unknown_names_list_the_alternatives() {
        let err = resolve(TABLE, "scale", "linear", &[]).err().unwrap();
        assert_eq!(
            err,
            ConfigError::UnknownPlugin {
                kind: "scale",
                name: "linear".to_string(),
                available: "constant".to_string(),
            }
        );
        assert_eq!(names(TABLE), vec!["constant"]);
    }

    #[test]
    fn argument_count_is_checked() {
        assert!(matches!(
            resolve(TABLE, "scale", "constant", &[1.0, 2.0]),
            Err(ConfigError::ArgumentCount {
                expected: 1,
                found: 2,
                ..
            })
        ));
    }
}
