use depokit::engine::config::DistributionSpec;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("Distribution name cannot be empty in '{0}'.")]
    EmptyName(String),

    #[error(
        "Invalid argument '{argument}' in '{spec}'. \
         Expected 'name[:a,b,...]' with numeric arguments."
    )]
    InvalidArgument { spec: String, argument: String },

    #[error("Invalid --set format: '{0}'. Expected KEY=VALUE.")]
    InvalidAssignment(String),
}

/// Parses `name` or `name:a,b,...` into a distribution selection. An empty
/// argument list selects the distribution's defaults.
pub fn parse_distribution(spec: &str) -> Result<DistributionSpec, ParseError> {
    let (name, raw_args) = match spec.split_once(':') {
        Some((name, args)) => (name.trim(), args.trim()),
        None => (spec.trim(), ""),
    };
    if name.is_empty() {
        return Err(ParseError::EmptyName(spec.to_string()));
    }
    let args = raw_args
        .split(',')
        .map(str::trim)
        .filter(|a| !a.is_empty())
        .map(|a| {
            a.parse::<f64>().map_err(|_| ParseError::InvalidArgument {
                spec: spec.to_string(),
                argument: a.to_string(),
            })
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(DistributionSpec::new(name, args))
}

/// Splits `KEY=VALUE` at the first `=`.
pub fn parse_assignment(pair: &str) -> Result<(&str, &str), ParseError> {
    match pair.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => Ok((key.trim(), value.trim())),
        _ => Err(ParseError::InvalidAssignment(pair.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_name_selects_default_arguments() {
        assert_eq!(
            parse_distribution("uniform"),
            Ok(DistributionSpec::new("uniform", vec![]))
        );
    }

    #[test]
    fn arguments_follow_a_colon() {
        assert_eq!(
            parse_distribution("gaussian: 300, 26.982 ,0"),
            Ok(DistributionSpec::new("gaussian", vec![300.0, 26.982, 0.0]))
        );
        assert_eq!(
            parse_distribution("fixed:0,0,-1e2"),
            Ok(DistributionSpec::new("fixed", vec![0.0, 0.0, -100.0]))
        );
    }

    #[test]
    fn malformed_specs_are_rejected() {
        assert_eq!(
            parse_distribution(":1,2"),
            Err(ParseError::EmptyName(":1,2".to_string()))
        );
        assert!(matches!(
            parse_distribution("fixed:1,two"),
            Err(ParseError::InvalidArgument { argument, .. }) if argument == "two"
        ));
    }

    #[test]
    fn assignments_split_at_the_first_equals_sign() {
        assert_eq!(
            parse_assignment("driver.arguments=-var x=1"),
            Ok(("driver.arguments", "-var x=1"))
        );
        assert!(parse_assignment("deposition-height").is_err());
        assert!(parse_assignment("=4").is_err());
    }
}
