//! Fixtures shared by the integration tests
#![allow(dead_code)]

use std::io::Write;
use std::net::{Ipv4Addr, TcpListener};
use tempfile::NamedTempFile;

/// Small French dictionary covering the documented matching scenarios
pub const DICTIONARY: &str = "\
1\tdouleur thoracique
2\tcardio circulatoire
3\tdouleur chronique
4\tfievre
5\tfievre jaune
6\tinsuffisance cardiaque
";

pub fn write_dictionary(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("create dictionary file");
    file.write_all(contents.as_bytes())
        .expect("write dictionary file");
    file.flush().expect("flush dictionary file");
    file
}

/// A port that was free a moment ago
pub fn free_port() -> u16 {
    let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).expect("bind ephemeral port");
    listener.local_addr().expect("local addr").port()
}
