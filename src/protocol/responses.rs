//! FTP Response handling
//!
//! The fixed catalog of status replies and the wire encoding of the
//! passive-mode address tuple.

use std::fmt;
use std::net::{Ipv4Addr, SocketAddrV4};

/// Status replies understood by the server, keyed by their RFC 959 code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum StatusReply {
    FileStatusOkay = 150,
    CommandOkay = 200,
    ServiceReady = 220,
    ClosingControlConnection = 221,
    ClosingDataConnection = 226,
    UserLoggedIn = 230,
    FileActionOkay = 250,
    NeedPassword = 331,
    ServiceNotAvailable = 421,
    CantOpenDataConnection = 425,
    TransferAborted = 426,
    FileActionNotTaken = 450,
    LocalError = 451,
    CommandUnrecognized = 500,
    ParameterSyntaxError = 501,
    CommandNotImplemented = 502,
    BadCommandSequence = 503,
    NotImplementedForParameter = 504,
    NotLoggedIn = 530,
    ActionNotTaken = 550,
    PageTypeUnknown = 551,
    FileActionAborted = 552,
    FileNameNotAllowed = 553,
}

impl StatusReply {
    /// Three digit reply code.
    pub fn code(self) -> u16 {
        self as u16
    }

    /// Human readable text following the code.
    pub fn text(self) -> &'static str {
        match self {
            StatusReply::FileStatusOkay => "File status okay about to open data connection.",
            StatusReply::CommandOkay => "Command okay.",
            StatusReply::ServiceReady => "Service ready for new user.",
            StatusReply::ClosingControlConnection => "Service closing control connection.",
            StatusReply::ClosingDataConnection => "Closing data connection.",
            StatusReply::UserLoggedIn => "User logged in, proceed.",
            StatusReply::FileActionOkay => "Requested file action okay, completed.",
            StatusReply::NeedPassword => "User name okay, need password.",
            StatusReply::ServiceNotAvailable => {
                "Service not available, closing control connection."
            }
            StatusReply::CantOpenDataConnection => "Can't open data connection.",
            StatusReply::TransferAborted => "Connection closed transfer aborted.",
            StatusReply::FileActionNotTaken => "Requested file action not taken.",
            StatusReply::LocalError => "Requested action aborted: local error in processing.",
            StatusReply::CommandUnrecognized => "Syntax error, command unrecognized.",
            StatusReply::ParameterSyntaxError => "Syntax error in parameters or arguments.",
            StatusReply::CommandNotImplemented => "Command not implemented.",
            StatusReply::BadCommandSequence => "Bad sequence of Command.",
            StatusReply::NotImplementedForParameter => {
                "Command not implemented for that parameter."
            }
            StatusReply::NotLoggedIn => "Not logged in.",
            StatusReply::ActionNotTaken => "Requested action not taken.",
            StatusReply::PageTypeUnknown => "Requested action aborted: page type unknown.",
            StatusReply::FileActionAborted => "Requested file action aborted.",
            StatusReply::FileNameNotAllowed => "Requested action not taken.",
        }
    }

    /// The CRLF terminated line sent on the control connection.
    pub fn line(self) -> String {
        format_response(self.code(), self.text())
    }
}

impl fmt::Display for StatusReply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.code(), self.text())
    }
}

/// Format an FTP response message
pub fn format_response(code: u16, message: &str) -> String {
    format!("{} {}\r\n", code, message)
}

/// The `227` reply advertising a passive data endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PassiveReply {
    addr: SocketAddrV4,
}

impl PassiveReply {
    pub fn new(ip: Ipv4Addr, port: u16) -> Self {
        Self {
            addr: SocketAddrV4::new(ip, port),
        }
    }

    /// The six integers of the reply: four address octets, then the port
    /// high byte followed by the low byte.
    pub fn tuple(&self) -> [u8; 6] {
        let [h1, h2, h3, h4] = self.addr.ip().octets();
        let [p1, p2] = self.addr.port().to_be_bytes();
        [h1, h2, h3, h4, p1, p2]
    }

    pub fn line(&self) -> String {
        format!("{}\r\n", self)
    }

    /// Extracts the advertised endpoint from a `227` reply line.
    pub fn parse(line: &str) -> Option<SocketAddrV4> {
        let rest = line.trim_end().strip_prefix("227 ")?;
        let start = rest.find('(')?;
        let end = rest[start..].find(')')? + start;

        let numbers = rest[start + 1..end]
            .split(',')
            .map(|part| part.trim().parse::<u8>())
            .collect::<Result<Vec<u8>, _>>()
            .ok()?;

        match numbers.as_slice() {
            [h1, h2, h3, h4, p1, p2] => Some(SocketAddrV4::new(
                Ipv4Addr::new(*h1, *h2, *h3, *h4),
                u16::from_be_bytes([*p1, *p2]),
            )),
            _ => None,
        }
    }
}

impl fmt::Display for PassiveReply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [h1, h2, h3, h4, p1, p2] = self.tuple();
        write!(
            f,
            "227 Entering Passive Mode ({},{},{},{},{},{}).",
            h1, h2, h3, h4, p1, p2
        )
    }
}
