//! # dbc
//!
//! `dbc` is the module to work with .dbc files: parse them into a [`DbcFile`],
//! decode/encode signal values, write them back, and route CAN sources to
//! files through the [`Manager`].

pub mod core;
pub mod events;
pub mod manager;
pub mod options;
pub mod parse;
pub mod save;
pub mod types;

pub use events::{DbcEvent, Listener, ListenerKey};
pub use manager::{FileKey, Manager};
pub use options::{ReadOptions, TextEncoding};
pub use types::{
    color::{Rgb, Theme},
    errors::{DbcError, LayoutError, ModelError, ParseError, ParseErrorKind},
    file::DbcFile,
    message::{Message, SignalKey},
    message_id::{GLOBAL_SOURCE, MessageId, MessageIdParseError, SourceId, SourceSet, sources_to_string},
    signal::{DEFAULT_NODE_NAME, Endianness, MuxRole, Signal, Signess, ValueTable},
};

use std::path::Path;

/// Parses a DBC file from disk with default [`ReadOptions`].
///
/// # Example
/// ```no_run
/// use dbc_tools::dbc;
///
/// let file = dbc::from_file("example.dbc").expect("Failed to parse DBC file");
/// println!("Parsed {} messages", file.len());
/// ```
pub fn from_file<P: AsRef<Path>>(path: P) -> Result<DbcFile, DbcError> {
    parse::from_file(path.as_ref(), &ReadOptions::default())
}

/// Parses DBC text held in memory.
pub fn from_str(name: &str, content: &str) -> Result<DbcFile, ParseError> {
    parse::from_str(name, content)
}

#[test]
fn test_parse_from_str() {
    let dbc_content = r#"
VERSION "1.0.2"

NS_ :
	NS_DESC_
	CM_
	BA_DEF_
	VAL_

BU_: Motor Infotainment Gateway

BO_ 2527679645 Motor_01: 8 Motor
 SG_ Status : 61|1@1+ (1,0) [0|1] ""  Infotainment,Gateway
 SG_ Overheat : 62|1@1+ (1,0) [0|1] ""  Gateway
 SG_ Engine_Speed : 48|8@1+ (1,0) [0|255] "km/h" Infotainment
 SG_ Failure : 63|1@1+ (1,0) [0|1] "" Infotainment,Gateway

BO_ 708 ZV_04: 8 ICAS1_X_Gateway
 SG_ UHF_FFB_SKC_anlernen : 61|1@1+ (1.0,0.0) [0.0|1] ""  Vector__XXX
 SG_ ZV_HW_Motor_Safe_Hinten : 62|1@1+ (1.0,0.0) [0.0|1] ""  Vector__XXX
 SG_ ZV_HW_Motor_Lock_HK : 63|1@1+ (1.0,0.0) [0.0|1] ""  Vector__XXX

BO_TX_BU_ 2527679645 : Backup_Motor;

CM_ BO_ 2527679645 "Funny comment about Motor_01";
CM_ SG_ 2527679645 Engine_Speed "This comment tells you everything about Engine Speed.";
CM_ SG_ 2527679645 Status "This comment tells you everything
about Motor Status.";
CM_ BU_ Motor "Motor ECU is really important for vehicle motion.";

BA_ "Baudrate" 500000;

VAL_ 2527679645 Status 1 "On" 0 "Off" ;
VAL_ 2527679645 Engine_Speed 255 "Error";
VAL_ 708 ZV_HW_Motor_Lock_HK 0 "Schloss_nicht_ansteuern" 1 "Schloss_ansteuern" ;
"#;

    let file: DbcFile = from_str("TestCAN", dbc_content).expect("Failed to parse DBC");

    // --- Header ---
    assert!(file.header.starts_with("\nVERSION \"1.0.2\"\n"));
    assert!(file.header.ends_with("BU_: Motor Infotainment Gateway\n\n"));

    // --- Messages, by address ---
    let addresses: Vec<u32> = file.messages().keys().copied().collect();
    assert_eq!(addresses, vec![708, 2527679645]);

    let msg = file.msg(2527679645).unwrap();
    assert_eq!(msg.name, "Motor_01");
    assert_eq!(msg.size, 8);
    assert_eq!(msg.transmitter, "Motor");
    assert_eq!(msg.comment, "Funny comment about Motor_01");

    // sorted by start bit
    let names: Vec<&str> = msg.signals().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["Engine_Speed", "Status", "Overheat", "Failure"]);
    assert_eq!(msg.mask()[6], 0xFF);
    assert_eq!(msg.mask()[7], 0xE0);

    let status = msg.sig("Status").unwrap();
    assert_eq!(status.receiver_name, "Infotainment,Gateway");
    assert_eq!(status.comment, "This comment tells you everything\nabout Motor Status.");
    assert_eq!(status.value_table, vec![(1, "On".to_string()), (0, "Off".to_string())]);

    let speed = msg.sig("Engine_Speed").unwrap();
    assert_eq!(speed.unit, "km/h");
    assert_eq!(speed.max, 255.0);
    assert_eq!(speed.format_value(255.0, true), "Error");
    assert_eq!(speed.format_value(120.0, true), "120 km/h");

    let data = [0, 0, 0, 0, 0, 0, 120, 0b1010_0000];
    assert_eq!(
        msg.decode(&data),
        vec![("Engine_Speed", 120.0), ("Status", 1.0), ("Overheat", 0.0), ("Failure", 1.0)]
    );

    let lock = file.signal(708, "ZV_HW_Motor_Lock_HK").unwrap();
    assert_eq!(lock.value_description(0), Some("Schloss_nicht_ansteuern"));
    assert_eq!(lock.value_description(1), Some("Schloss_ansteuern"));
    assert_eq!(lock.receiver_name, "Vector__XXX");
}
