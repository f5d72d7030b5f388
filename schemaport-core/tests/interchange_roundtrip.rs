//! The JSON interchange form must carry every structural detail of a
//! snapshot without loss.

use schemaport_core::models::{
    Column, ColumnKey, Event, EventSchedule, ForeignKey, Index, ReferentialAction, Routine,
    RoutineKind, Schema, Table, Trigger, TriggerEvent, TriggerTiming, View,
};
use schemaport_core::{from_interchange, to_interchange};

fn full_snapshot() -> Schema {
    let mut schema = Schema::new("shop");
    schema.charset = Some("utf8mb4".to_string());
    schema.collation = Some("utf8mb4_0900_ai_ci".to_string());
    schema.server_version = Some("8.0.39".to_string());

    schema.tables.push(Table {
        name: "user".to_string(),
        columns: vec![
            Column {
                name: "id".to_string(),
                column_type: "int".to_string(),
                nullable: false,
                default: None,
                extra: "auto_increment".to_string(),
                comment: None,
                charset: None,
                collation: None,
                key: ColumnKey::Primary,
            },
            Column {
                name: "email".to_string(),
                column_type: "varchar(255)".to_string(),
                nullable: true,
                default: Some("NULL".to_string()),
                extra: String::new(),
                comment: Some("Login address".to_string()),
                charset: Some("utf8mb4".to_string()),
                collation: Some("utf8mb4_0900_ai_ci".to_string()),
                key: ColumnKey::Unique,
            },
        ],
        indexes: vec![Index {
            name: "uq_email".to_string(),
            table: "user".to_string(),
            column: "email".to_string(),
            seq_in_index: 1,
            unique: true,
            index_type: Some("BTREE".to_string()),
            cardinality: Some(42),
            comment: None,
        }],
        foreign_keys: vec![ForeignKey {
            name: "fk_team".to_string(),
            table: "user".to_string(),
            column: "team_id".to_string(),
            referenced_table: "team".to_string(),
            referenced_column: "id".to_string(),
            on_update: ReferentialAction::Cascade,
            on_delete: ReferentialAction::SetNull,
        }],
        engine: Some("InnoDB".to_string()),
        collation: Some("utf8mb4_0900_ai_ci".to_string()),
        comment: Some("Accounts".to_string()),
        create_statement: Some("CREATE TABLE IF NOT EXISTS `user` (`id` int)".to_string()),
    });

    schema.views.push(View {
        name: "active_user".to_string(),
        definition: "select `id` from `user`".to_string(),
        check_option: Some("NONE".to_string()),
        is_updatable: true,
        definer: Some("root@localhost".to_string()),
        security_type: Some("DEFINER".to_string()),
        charset: Some("utf8mb4".to_string()),
        collation: None,
    });

    schema.functions.push(Routine {
        name: "user_total".to_string(),
        kind: RoutineKind::Function,
        body: "RETURN (SELECT COUNT(*) FROM `user`);".to_string(),
        returns: Some("int".to_string()),
        definer: Some("root@localhost".to_string()),
        created: Some("2026-01-01 00:00:00".to_string()),
        modified: None,
        data_access: Some("READS SQL DATA".to_string()),
        deterministic: false,
        security_type: Some("DEFINER".to_string()),
        comment: None,
    });

    schema.procedures.push(Routine {
        name: "purge_users".to_string(),
        kind: RoutineKind::Procedure,
        body: "DELETE FROM `user` WHERE `email` IS NULL;".to_string(),
        returns: None,
        definer: None,
        created: None,
        modified: None,
        data_access: Some("MODIFIES SQL DATA".to_string()),
        deterministic: false,
        security_type: None,
        comment: Some("Housekeeping".to_string()),
    });

    schema.triggers.push(Trigger {
        name: "user_audit".to_string(),
        table: "user".to_string(),
        timing: TriggerTiming::After,
        event: TriggerEvent::Insert,
        statement: "INSERT INTO audit VALUES (NEW.id)".to_string(),
        definer: None,
        sql_mode: Some("STRICT_TRANS_TABLES".to_string()),
        created: None,
        charset: None,
        collation: None,
    });

    schema.events.push(Event {
        name: "nightly_purge".to_string(),
        definer: None,
        timezone: Some("SYSTEM".to_string()),
        schedule: EventSchedule::Recurring {
            interval_value: "1".to_string(),
            interval_field: "DAY".to_string(),
        },
        next_execution: Some("2026-09-01 00:00:00".to_string()),
        status: Some("ENABLED".to_string()),
        on_completion: Some("NOT PRESERVE".to_string()),
        body: "CALL purge_users()".to_string(),
        comment: None,
    });

    schema
}

#[test]
fn snapshot_round_trips_through_interchange() {
    let original = full_snapshot();
    let json = to_interchange(&original).unwrap();
    let parsed = from_interchange(&json).unwrap();
    assert_eq!(parsed, original);
}

#[test]
fn interchange_document_is_versioned() {
    let json = to_interchange(&full_snapshot()).unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value["format_version"], "1.0");
    assert_eq!(value["database"], "shop");
    assert_eq!(value["tables"][0]["name"], "user");
}

#[test]
fn one_time_schedule_survives_the_round_trip() {
    let mut schema = full_snapshot();
    schema.events[0].schedule = EventSchedule::OneTime {
        execute_at: "2026-12-31 23:59:59".to_string(),
    };
    let parsed = from_interchange(&to_interchange(&schema).unwrap()).unwrap();
    assert_eq!(parsed.events[0].schedule, schema.events[0].schedule);
}
