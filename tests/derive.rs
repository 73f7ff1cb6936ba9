#![allow(dead_code)]

mod support;

use crankset::{
    Options,
    fit::{FromMessage, FromMessages, FromValue, Value},
};
use support::{START, V};

#[derive(Debug, Default, FromMessages)]
struct ActivityMessages {
    #[message(0)]
    file_id: Option<FileId>,
    #[message(20)]
    records: Vec<Record>,
    #[message(23)]
    devices: Vec<Device>,
    unrelated: u32,
}

#[derive(Debug, Default, FromMessage)]
struct FileId {
    #[field(0, |v: &Value| u8::from_value(v) == Some(4))]
    is_activity: bool,
    #[field(1)]
    manufacturer: Option<u16>,
    #[field(2)]
    product: Option<u16>,
    #[field(4)]
    time_created: Option<u32>,
}

#[derive(Debug, Default, FromMessage)]
struct Record {
    #[field(253)]
    timestamp: Option<u32>,
    #[field(0)]
    position_lat: Option<i32>,
    #[field(3)]
    heart_rate: Option<u8>,
    // Wider than the field's base type.
    #[field(4)]
    cadence: Option<u32>,
    // Narrower than the field's base type, so values above 255 are absent.
    #[field(6)]
    speed: Option<u8>,
}

#[derive(Debug, Default, FromMessage)]
struct Device {
    #[field(27)]
    product_name: Option<String>,
}

#[test]
fn derived_receivers() {
    let data = support::ride();
    let mut messages = ActivityMessages::default();
    crankset::fit::decode(&data, &Options::default(), &mut messages).unwrap();

    let file_id = messages.file_id.unwrap();
    assert!(file_id.is_activity);
    assert_eq!(file_id.manufacturer, Some(1));
    assert_eq!(file_id.product, Some(1036));
    assert_eq!(file_id.time_created, Some(START - 60));

    // Every record, in file order, including the one before the start.
    assert_eq!(messages.records.len(), 8);
    assert_eq!(messages.records[0].timestamp, Some(START - 5));
    assert_eq!(messages.records[4].timestamp, Some(START + 40));
    assert_eq!(messages.records[1].heart_rate, Some(120));
    assert_eq!(messages.records[1].cadence, Some(80));
    assert_eq!(messages.records[1].position_lat, Some(609_116_199));
    assert_eq!(messages.records[1].speed, None);

    assert_eq!(messages.devices.len(), 1);
    assert_eq!(messages.devices[0].product_name.as_deref(), Some("Edge 500"));
    assert_eq!(messages.unrelated, 0);
}

#[test]
fn handler_keeps_default_when_absent() {
    let mut fit = support::Fit::new();
    fit.message(0, 0, &[(1, V::U16(1))]);

    let mut messages = ActivityMessages::default();
    crankset::fit::decode(&fit.finish(), &Options::default(), &mut messages).unwrap();

    let file_id = messages.file_id.unwrap();
    assert!(!file_id.is_activity);
    assert_eq!(file_id.manufacturer, Some(1));
}

#[test]
fn later_messages_overwrite() {
    let mut fit = support::Fit::new();
    fit.message(0, 0, &[(2, V::U16(1036))]);
    fit.data(0, &[(2, V::U16(1328))]);

    let mut messages = ActivityMessages::default();
    crankset::fit::decode(&fit.finish(), &Options::default(), &mut messages).unwrap();

    assert_eq!(messages.file_id.unwrap().product, Some(1328));
}
