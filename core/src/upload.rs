//! Uploader: post the latest reading to the InfluxDB v2 write endpoint

use core::fmt::Write;

use embassy_time::Timer;
use heapless::String;

use crate::config::{ConfigError, InfluxConfig};
use crate::line_protocol;
use crate::log::{LogSink, Truncating, message};
use crate::network::{NetworkLink, OnceAssociated};
use crate::reading::SharedReading;
use crate::schedule::{Cycle, UPLOAD_INTERVAL};

pub const URL_CAPACITY: usize = 256;
pub const AUTHORIZATION_CAPACITY: usize = 128;
pub const RESPONSE_TEXT_CAPACITY: usize = 160;

/// Status returned by InfluxDB when a write is accepted
pub const STATUS_NO_CONTENT: u16 = 204;

/// Declared content type. The body is line protocol, not JSON; the header
/// is what the deployed collector has always received and is kept as is.
pub const CONTENT_TYPE: &str = "application/json";

/// Leading part of a response body kept for error reports
pub type ResponseText = String<RESPONSE_TEXT_CAPACITY>;

/// Fixed parts of every write request
#[derive(Debug, Clone)]
pub struct WriteRequest {
    url: String<URL_CAPACITY>,
    authorization: String<AUTHORIZATION_CAPACITY>,
}

impl WriteRequest {
    /// Build `<url>?org=<org>&bucket=<bucket>` and the token header
    pub fn new(config: &InfluxConfig<'_>) -> Result<Self, ConfigError> {
        let mut url = String::new();
        write!(
            url,
            "{}?org={}&bucket={}",
            config.url, config.org, config.bucket
        )
        .map_err(|_| ConfigError::UrlTooLong)?;

        let mut authorization = String::new();
        write!(authorization, "Token {}", config.token)
            .map_err(|_| ConfigError::TokenTooLong)?;

        Ok(Self { url, authorization })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Request headers in send order
    pub fn headers(&self) -> [(&str, &str); 2] {
        [
            ("Authorization", self.authorization.as_str()),
            ("Content-Type", CONTENT_TYPE),
        ]
    }
}

/// Status and leading body text of a completed request.
///
/// Owning the text means the connection and receive buffer are released
/// before the caller looks at the result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: ResponseText,
}

impl HttpResponse {
    /// Keep the valid UTF-8 prefix of `body`, truncated to capacity
    pub fn new(status: u16, body: &[u8]) -> Self {
        let text = match core::str::from_utf8(body) {
            Ok(text) => text,
            Err(e) => core::str::from_utf8(&body[..e.valid_up_to()]).unwrap_or_default(),
        };
        let mut out = Truncating(ResponseText::new());
        let _ = out.write_str(text);
        Self {
            status,
            body: out.0,
        }
    }

    /// Like [`HttpResponse::new`], but a body that could not be read is
    /// kept as empty text so the status still decides the outcome
    pub fn with_body_result<B: AsRef<[u8]>, E>(status: u16, body: Result<B, E>) -> Self {
        match body {
            Ok(body) => Self::new(status, body.as_ref()),
            Err(_) => Self::new(status, &[]),
        }
    }
}

/// Reusable HTTP(S) session
#[allow(async_fn_in_trait)]
pub trait HttpSession {
    type Error: core::fmt::Debug;

    /// POST `body` with the request's URL and headers
    async fn post(
        &mut self,
        request: &WriteRequest,
        body: &[u8],
    ) -> Result<HttpResponse, Self::Error>;
}

/// Result of one upload cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum UploadOutcome {
    /// No reading yet, nothing sent
    NoReading,
    /// 204 No Content
    Accepted,
    /// Any other status
    Rejected { status: u16 },
    /// The request did not complete
    TransportFailed,
}

/// Send the latest reading once, if there is one
pub async fn upload_once<H, L>(
    session: &mut H,
    request: &WriteRequest,
    shared: &SharedReading,
    log: &L,
) -> UploadOutcome
where
    H: HttpSession,
    L: LogSink,
{
    let Some(reading) = shared.latest() else {
        return UploadOutcome::NoReading;
    };
    let body = line_protocol::encode(&reading);

    match session.post(request, body.as_bytes()).await {
        Ok(response) if response.status == STATUS_NO_CONTENT => {
            log.info("Data sent to InfluxDB successfully!").await;
            UploadOutcome::Accepted
        }
        Ok(response) => {
            log.error(&message(format_args!(
                "Failed to send data to InfluxDB:{}",
                response.body
            )))
            .await;
            UploadOutcome::Rejected {
                status: response.status,
            }
        }
        Err(e) => {
            log.error(&message(format_args!(
                "Error sending data to InfluxDB:{:?}",
                e
            )))
            .await;
            UploadOutcome::TransportFailed
        }
    }
}

/// Upload task state; the session is built on first association and reused
pub struct Uploader<'a, N, F, H> {
    session: OnceAssociated<N, F, H>,
    request: WriteRequest,
    shared: &'a SharedReading,
}

impl<'a, N, F, H> Uploader<'a, N, F, H>
where
    N: NetworkLink,
    F: FnOnce() -> H,
    H: HttpSession,
{
    pub fn new(link: N, connect: F, request: WriteRequest, shared: &'a SharedReading) -> Self {
        Self {
            session: OnceAssociated::new(link, connect),
            request,
            shared,
        }
    }

    /// One step: wait for the network, or run one upload cycle
    pub async fn step<L: LogSink>(&mut self, log: &L) -> Cycle<UploadOutcome> {
        match self.session.ready() {
            Some(session) => {
                Cycle::Ran(upload_once(session, &self.request, self.shared, log).await)
            }
            None => Cycle::AwaitingNetwork,
        }
    }

    pub async fn run<L: LogSink>(mut self, log: &L) -> ! {
        loop {
            let cycle = self.step(log).await;
            Timer::after(cycle.next_delay(UPLOAD_INTERVAL)).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log::Severity;
    use crate::log::testing::RecordingLog;
    use crate::reading::Reading;
    use core::cell::{Cell, RefCell};
    use embassy_futures::block_on;
    use std::string::String as StdString;
    use std::vec::Vec;

    const INFLUX: InfluxConfig<'static> = InfluxConfig {
        url: "https://influx.example.com/api/v2/write",
        org: "home",
        bucket: "weather",
        token: "s3cr3t",
    };

    struct Link(Cell<bool>);

    impl NetworkLink for Link {
        fn is_associated(&self) -> bool {
            self.0.get()
        }
    }

    #[derive(Debug)]
    struct Sent {
        url: StdString,
        headers: Vec<(StdString, StdString)>,
        body: StdString,
    }

    struct FakeSession<'a> {
        sent: &'a RefCell<Vec<Sent>>,
        reply: Result<(u16, &'static str), &'static str>,
    }

    impl HttpSession for FakeSession<'_> {
        type Error = &'static str;

        async fn post(
            &mut self,
            request: &WriteRequest,
            body: &[u8],
        ) -> Result<HttpResponse, Self::Error> {
            self.sent.borrow_mut().push(Sent {
                url: request.url().into(),
                headers: request
                    .headers()
                    .iter()
                    .map(|(k, v)| ((*k).into(), (*v).into()))
                    .collect(),
                body: StdString::from_utf8(body.to_vec()).unwrap(),
            });
            self.reply
                .map(|(status, text)| HttpResponse::new(status, text.as_bytes()))
        }
    }

    fn sample() -> Reading {
        Reading {
            temperature_c: 21.5,
            pressure_hpa: 1013.25,
        }
    }

    #[test]
    fn test_write_request_url_and_headers() {
        let request = WriteRequest::new(&INFLUX).unwrap();
        assert_eq!(
            request.url(),
            "https://influx.example.com/api/v2/write?org=home&bucket=weather"
        );
        assert_eq!(
            request.headers(),
            [
                ("Authorization", "Token s3cr3t"),
                ("Content-Type", "application/json")
            ]
        );
    }

    #[test]
    fn test_oversized_url_rejected() {
        let long = "x".repeat(URL_CAPACITY);
        let config = InfluxConfig {
            url: &long,
            ..INFLUX
        };
        assert_eq!(
            WriteRequest::new(&config).unwrap_err(),
            ConfigError::UrlTooLong
        );
    }

    #[test]
    fn test_no_request_without_reading() {
        let sent = RefCell::new(Vec::new());
        let shared = SharedReading::new();
        let log = RecordingLog::default();
        let link = Link(Cell::new(true));
        let mut uploader = Uploader::new(
            &link,
            || FakeSession {
                sent: &sent,
                reply: Ok((204, "")),
            },
            WriteRequest::new(&INFLUX).unwrap(),
            &shared,
        );

        for _ in 0..3 {
            assert_eq!(
                block_on(uploader.step(&log)),
                Cycle::Ran(UploadOutcome::NoReading)
            );
        }
        assert!(sent.borrow().is_empty());
        assert!(log.entries.borrow().is_empty());
    }

    #[test]
    fn test_one_request_per_cycle_once_reading_exists() {
        let sent = RefCell::new(Vec::new());
        let shared = SharedReading::new();
        let log = RecordingLog::default();
        let link = Link(Cell::new(true));
        let mut uploader = Uploader::new(
            &link,
            || FakeSession {
                sent: &sent,
                reply: Ok((204, "")),
            },
            WriteRequest::new(&INFLUX).unwrap(),
            &shared,
        );

        shared.store(sample());
        for cycle in 1..=4 {
            assert_eq!(
                block_on(uploader.step(&log)),
                Cycle::Ran(UploadOutcome::Accepted)
            );
            assert_eq!(sent.borrow().len(), cycle);
        }

        let sent = sent.borrow();
        assert_eq!(
            sent[0].body,
            "temperature,device=bmp180 value=21.5\npressure,device=bmp180 value=1013.25"
        );
        assert_eq!(
            sent[0].url,
            "https://influx.example.com/api/v2/write?org=home&bucket=weather"
        );
        assert_eq!(sent[0].headers[0].1, "Token s3cr3t");
        assert_eq!(
            log.messages(Severity::Info).len(),
            4,
            "every accepted write is logged"
        );
    }

    #[test]
    fn test_waits_for_network_before_building_session() {
        let sent = RefCell::new(Vec::new());
        let built = Cell::new(0);
        let shared = SharedReading::new();
        shared.store(sample());
        let log = RecordingLog::default();
        let link = Link(Cell::new(false));
        let mut uploader = Uploader::new(
            &link,
            || {
                built.set(built.get() + 1);
                FakeSession {
                    sent: &sent,
                    reply: Ok((204, "")),
                }
            },
            WriteRequest::new(&INFLUX).unwrap(),
            &shared,
        );

        assert_eq!(block_on(uploader.step(&log)), Cycle::AwaitingNetwork);
        assert_eq!(built.get(), 0);

        link.0.set(true);
        block_on(uploader.step(&log));
        block_on(uploader.step(&log));
        assert_eq!(built.get(), 1);
        assert_eq!(sent.borrow().len(), 2);
    }

    #[test]
    fn test_non_204_logs_error_with_body() {
        for (status, text) in [(400, "bad line protocol"), (500, "internal error")] {
            let sent = RefCell::new(Vec::new());
            let shared = SharedReading::new();
            shared.store(sample());
            let log = RecordingLog::default();
            let mut session = FakeSession {
                sent: &sent,
                reply: Ok((status, text)),
            };
            let request = WriteRequest::new(&INFLUX).unwrap();

            assert_eq!(
                block_on(upload_once(&mut session, &request, &shared, &log)),
                UploadOutcome::Rejected { status }
            );
            assert_eq!(
                log.messages(Severity::Error),
                [std::format!("Failed to send data to InfluxDB:{}", text)]
            );
            assert!(log.messages(Severity::Info).is_empty());
        }
    }

    #[test]
    fn test_transport_error_logged_and_contained() {
        let sent = RefCell::new(Vec::new());
        let shared = SharedReading::new();
        shared.store(sample());
        let log = RecordingLog::default();
        let mut session = FakeSession {
            sent: &sent,
            reply: Err("connection reset"),
        };
        let request = WriteRequest::new(&INFLUX).unwrap();

        assert_eq!(
            block_on(upload_once(&mut session, &request, &shared, &log)),
            UploadOutcome::TransportFailed
        );
        assert_eq!(
            log.messages(Severity::Error),
            ["Error sending data to InfluxDB:\"connection reset\""]
        );
    }

    #[test]
    fn test_response_text_keeps_valid_prefix() {
        let response = HttpResponse::new(400, b"bad \xF0\x28 data");
        assert_eq!(response.body.as_str(), "bad ");

        let long = [b'a'; RESPONSE_TEXT_CAPACITY + 10];
        assert_eq!(
            HttpResponse::new(500, &long).body.len(),
            RESPONSE_TEXT_CAPACITY
        );
    }

    #[test]
    fn test_unreadable_error_body_still_rejected() {
        let response = HttpResponse::with_body_result(413, Err::<&[u8], _>("buffer too small"));
        assert_eq!(response.status, 413);
        assert!(response.body.is_empty());

        let sent = RefCell::new(Vec::new());
        let shared = SharedReading::new();
        shared.store(sample());
        let log = RecordingLog::default();
        let mut session = FakeSession {
            sent: &sent,
            reply: Ok((413, "")),
        };
        let request = WriteRequest::new(&INFLUX).unwrap();

        assert_eq!(
            block_on(upload_once(&mut session, &request, &shared, &log)),
            UploadOutcome::Rejected { status: 413 }
        );
        assert_eq!(
            log.messages(Severity::Error),
            ["Failed to send data to InfluxDB:"]
        );
    }
}
