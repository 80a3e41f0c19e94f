//! Normalization of relational schemes into second or third normal form
//! driven by functional dependencies, and compilation of schemes to SQL DDL.

pub mod error;
pub mod lexer;
pub mod model;
pub mod normalize;
pub mod parser;
pub mod serializer;
pub mod sql;

use serde::Serialize;
use wasm_bindgen::prelude::*;

pub use error::SchemeError;
pub use model::Scheme;
pub use normalize::{NormalForm, NormalFormViolation, Normalizer, NormalizerConfig};
pub use sql::{Dialect, QueryBuilder};

/// Normalize every table of `scheme` to `form`.
pub fn normalize_scheme(
    scheme: &Scheme,
    form: NormalForm,
    config: NormalizerConfig,
) -> Result<Scheme, Vec<NormalFormViolation>> {
    Normalizer::with_config(scheme, config).normalize(form)
}

/// Validate `scheme` and compile it to DDL statements, one per line.
pub fn build_ddl(scheme: Scheme, dialect: Dialect) -> Result<String, SchemeError> {
    let mut builder = QueryBuilder::with_dialect(dialect);
    builder.set_scheme(scheme)?;
    builder.build()
}

#[derive(Serialize)]
struct Normalized {
    scheme: model::dto::Scheme,
}

#[derive(Serialize)]
struct Violations<'a> {
    violations: &'a [NormalFormViolation],
}

/// Initialize panic hook for better error messages in WASM
#[wasm_bindgen(start)]
pub fn init() {
    #[cfg(target_arch = "wasm32")]
    console_error_panic_hook::set_once();
}

/// Normalize a scheme in its JSON wire form. `form` defaults to 3.
///
/// On success returns `{"scheme": ...}`; a scheme violating first normal
/// form is rejected with `{"violations": [...]}`.
#[wasm_bindgen(js_name = "normalize")]
pub fn normalize_json(source: &str, form: Option<u8>) -> Result<String, String> {
    let scheme = Scheme::from_json(source).map_err(|e| e.to_string())?;
    let form = match form {
        Some(n) => NormalForm::from_number(n).ok_or_else(|| format!("unsupported normal form: {}", n))?,
        None => NormalForm::default(),
    };

    match normalize_scheme(&scheme, form, NormalizerConfig::default()) {
        Ok(normalized) => serde_json::to_string(&Normalized {
            scheme: model::dto::Scheme::from(&normalized),
        })
        .map_err(|e| e.to_string()),
        Err(violations) => Err(serde_json::to_string(&Violations {
            violations: &violations,
        })
        .map_err(|e| e.to_string())?),
    }
}

/// Compile a scheme in its JSON wire form to DDL.
#[wasm_bindgen(js_name = "generateSql")]
pub fn generate_sql(source: &str, dialect: Option<String>) -> Result<String, String> {
    let dialect = match dialect.as_deref() {
        Some(name) => Dialect::from_str(name).ok_or_else(|| format!("unknown dialect: {}", name))?,
        None => Dialect::default(),
    };
    let scheme = Scheme::from_json(source).map_err(|e| e.to_string())?;

    build_ddl(scheme, dialect).map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const ORDERS: &str = r#"{
        "tables": [{
            "name": "Orders",
            "attributes": [
                {"name": "OrderId", "type": 0, "constraints": [1, 0]},
                {"name": "ProductId", "type": 0, "constraints": [1]},
                {"name": "CustomerName", "type": 2},
                {"name": "CustomerCity", "type": 2}
            ],
            "dependencies": [
                {"determinants": ["OrderId"], "dependants": ["CustomerName", "CustomerCity"]},
                {"determinants": ["OrderId", "ProductId"], "dependants": ["CustomerName", "CustomerCity"]}
            ]
        }],
        "relationships": []
    }"#;

    #[test]
    fn test_normalize_json() {
        let out = normalize_json(ORDERS, Some(2)).unwrap();
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();

        let tables = value["scheme"]["tables"].as_array().unwrap();
        assert_eq!(tables.len(), 2);
        assert_eq!(tables[0]["name"], "OrdersPart1");
        assert_eq!(value["scheme"]["relationships"][0]["from"]["tableName"], "OrdersPart2");
    }

    #[test]
    fn test_normalize_json_violations() {
        let source = r#"{
            "tables": [{"name": "t", "attributes": [{"name": "a", "type": 0}]}],
            "relationships": []
        }"#;
        let err = normalize_json(source, None).unwrap_err();
        assert_eq!(
            err,
            r#"{"violations":[{"tableName":"t","attributeName":"","violation":"no PK present"}]}"#
        );
    }

    #[test]
    fn test_normalize_json_rejects_bad_input() {
        assert!(normalize_json(r#"{"tables": []}"#, None).is_err());
        assert!(normalize_json(ORDERS, Some(4)).unwrap_err().contains("unsupported"));
    }

    #[test]
    fn test_generate_sql() {
        let source = r#"{
            "tables": [{"name": "t", "attributes": [{"name": "id", "type": 0, "constraints": [1, 0]}]}],
            "relationships": []
        }"#;
        assert_eq!(
            generate_sql(source, None).unwrap(),
            "CREATE TABLE \"t\" (\"id\" INTEGER NOT NULL PRIMARY KEY);"
        );
        assert!(generate_sql(source, Some("oracle".into())).is_err());
    }

    #[test]
    fn test_generate_sql_reports_validation_error() {
        let source = r#"{
            "tables": [
                {"name": "users", "attributes": []},
                {"name": "users", "attributes": []}
            ],
            "relationships": []
        }"#;
        assert_eq!(
            generate_sql(source, None).unwrap_err(),
            "duplicate entities in scheme: 'users'"
        );
    }

    #[test]
    fn test_normalized_scheme_compiles() {
        let scheme = Scheme::from_json(ORDERS).unwrap();
        let normalized = normalize_scheme(&scheme, NormalForm::Third, NormalizerConfig::default()).unwrap();
        let sql = build_ddl(normalized, Dialect::PostgreSQL).unwrap();

        assert!(sql.contains("CREATE TABLE \"OrdersPart2\" (\"OrderId\" INTEGER NOT NULL, \"ProductId\" INTEGER, PRIMARY KEY (\"OrderId\", \"ProductId\"));"));
        assert!(sql.contains("FOREIGN KEY (\"OrderId\") REFERENCES \"OrdersPart1\" (\"OrderId\");"));
    }
}
