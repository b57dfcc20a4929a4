//! Tests for the MS SQL Server transport: value conversion, config, and
//! error mapping. Wire behavior is covered against a live server
//! elsewhere; nothing here needs one.

use pretty_assertions::assert_eq;
use sprocket_core::{ProcError, RoutineTransport, Value};
use tiberius::ColumnData;

use crate::config::MssqlConfig;
use crate::transport::{column_to_value, value_to_param, MssqlParam, MssqlTransport, MssqlTransportError};

#[test]
fn null_column_data_maps_to_the_null_marker() {
    assert_eq!(column_to_value(ColumnData::I32(None)).unwrap(), Value::Null);
    assert_eq!(column_to_value(ColumnData::Bit(None)).unwrap(), Value::Null);
    assert_eq!(
        column_to_value(ColumnData::String(None)).unwrap(),
        Value::Null
    );
    assert_eq!(
        column_to_value(ColumnData::Binary(None)).unwrap(),
        Value::Null
    );
}

#[test]
fn scalar_column_data_maps_to_core_values() {
    assert_eq!(
        column_to_value(ColumnData::I32(Some(42))).unwrap(),
        Value::Int32(42)
    );
    assert_eq!(
        column_to_value(ColumnData::Bit(Some(true))).unwrap(),
        Value::Bool(true)
    );
    assert_eq!(
        column_to_value(ColumnData::F64(Some(2.5))).unwrap(),
        Value::Float64(2.5)
    );
    assert_eq!(
        column_to_value(ColumnData::String(Some(std::borrow::Cow::Owned(
            "hello".to_string()
        ))))
        .unwrap(),
        Value::String("hello".to_string())
    );
    assert_eq!(
        column_to_value(ColumnData::Binary(Some(std::borrow::Cow::Owned(vec![
            1, 2, 3
        ]))))
        .unwrap(),
        Value::Bytes(vec![1, 2, 3])
    );
}

#[test]
fn tinyint_widens_to_int16() {
    assert_eq!(
        column_to_value(ColumnData::U8(Some(200))).unwrap(),
        Value::Int16(200)
    );
}

#[test]
fn guid_column_data_round_trips() {
    let id = uuid::Uuid::new_v4();
    assert_eq!(
        column_to_value(ColumnData::Guid(Some(id))).unwrap(),
        Value::Uuid(id)
    );

    match value_to_param(&Value::Uuid(id)) {
        MssqlParam::Uuid(v) => assert_eq!(v, id),
        other => panic!("expected uuid param, got {other:?}"),
    }
}

#[test]
fn values_convert_to_placeholder_params() {
    assert!(matches!(value_to_param(&Value::Null), MssqlParam::Null));
    assert!(matches!(
        value_to_param(&Value::Int32(5)),
        MssqlParam::I32(5)
    ));
    assert!(matches!(
        value_to_param(&Value::Bool(true)),
        MssqlParam::Bool(true)
    ));
    match value_to_param(&Value::String("x".to_string())) {
        MssqlParam::String(s) => assert_eq!(s, "x"),
        other => panic!("expected string param, got {other:?}"),
    }
}

#[test]
fn temporal_values_travel_as_strings() {
    let date = chrono::NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
    match value_to_param(&Value::Date(date)) {
        MssqlParam::String(s) => assert_eq!(s, "2024-01-15"),
        other => panic!("expected string param, got {other:?}"),
    }

    match value_to_param(&Value::Decimal("123.45".to_string())) {
        MssqlParam::String(s) => assert_eq!(s, "123.45"),
        other => panic!("expected string param, got {other:?}"),
    }
}

#[test]
fn param_to_sql_emits_the_matching_column_data() {
    use tiberius::ToSql;

    assert!(matches!(MssqlParam::Null.to_sql(), ColumnData::I32(None)));
    assert!(matches!(
        MssqlParam::I64(9).to_sql(),
        ColumnData::I64(Some(9))
    ));
    assert!(matches!(
        MssqlParam::Bytes(vec![1]).to_sql(),
        ColumnData::Binary(Some(_))
    ));
}

#[test]
fn config_defaults_and_builders() {
    let config = MssqlConfig::default();
    assert_eq!(config.host, "localhost");
    assert_eq!(config.port, 1433);
    assert!(config.database.is_none());
    assert!(!config.trust_cert);

    let config = MssqlConfig::new("db.internal")
        .port(14330)
        .database("inventory")
        .credentials("svc", "pw")
        .trust_cert();
    assert_eq!(config.host, "db.internal");
    assert_eq!(config.port, 14330);
    assert_eq!(config.database.as_deref(), Some("inventory"));
    assert_eq!(config.username.as_deref(), Some("svc"));
    assert!(config.trust_cert);
}

#[test]
fn transport_starts_closed() {
    let transport = MssqlTransport::new(MssqlConfig::default());
    assert!(!transport.is_open());

    let debug = format!("{transport:?}");
    assert!(debug.contains("localhost"));
}

#[test]
fn transport_errors_convert_into_contextless_transport_errors() {
    let err: ProcError = MssqlTransportError::NotOpen.into();
    match err {
        ProcError::Transport { routine, message } => {
            assert!(routine.is_empty());
            assert!(message.contains("not open"));
        }
        other => panic!("expected transport error, got {other:?}"),
    }
}

#[test]
fn transport_error_display() {
    let err = MssqlTransportError::ConnectionFailed("refused".to_string());
    assert!(err.to_string().contains("Connection failed"));

    let err = MssqlTransportError::Timeout(std::time::Duration::from_secs(5));
    assert!(err.to_string().contains("timed out"));
}
