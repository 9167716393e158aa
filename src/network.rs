//! HTTPS session for the InfluxDB write endpoint
//! Using reqwless for the HTTP layer and embedded-tls underneath

use baro_core::upload::{HttpResponse, HttpSession, WriteRequest};
use defmt::warn;
use embassy_net::Stack;
use embassy_net::dns::DnsSocket;
use embassy_net::tcp::client::{TcpClient, TcpClientState};
use reqwless::client::{HttpClient, TlsConfig, TlsVerify};
use reqwless::request::{Method, RequestBuilder};
use static_cell::{ConstStaticCell, StaticCell};

/// TCP socket buffers
const TCP_BUFFER_SIZE: usize = 4096;

/// Largest TLS record plus overhead
const TLS_READ_BUFFER_SIZE: usize = 16_640;
const TLS_WRITE_BUFFER_SIZE: usize = 4096;

/// Response headers and the leading part of the body
const RESPONSE_BUFFER_SIZE: usize = 2048;

type Tcp = TcpClient<'static, 1, TCP_BUFFER_SIZE, TCP_BUFFER_SIZE>;

struct SessionBuffers {
    tls_read: [u8; TLS_READ_BUFFER_SIZE],
    tls_write: [u8; TLS_WRITE_BUFFER_SIZE],
    response: [u8; RESPONSE_BUFFER_SIZE],
}

static TCP_STATE: StaticCell<TcpClientState<1, TCP_BUFFER_SIZE, TCP_BUFFER_SIZE>> =
    StaticCell::new();
static TCP_CLIENT: StaticCell<Tcp> = StaticCell::new();
static DNS: StaticCell<DnsSocket<'static>> = StaticCell::new();
static BUFFERS: ConstStaticCell<SessionBuffers> = ConstStaticCell::new(SessionBuffers {
    tls_read: [0; TLS_READ_BUFFER_SIZE],
    tls_write: [0; TLS_WRITE_BUFFER_SIZE],
    response: [0; RESPONSE_BUFFER_SIZE],
});

/// HTTPS client and buffers, built once and reused for every upload.
///
/// reqwless opens a fresh TLS connection per request; the response is
/// consumed and dropped inside [`HttpSession::post`], which releases it.
/// Server certificates are not verified.
pub struct InfluxSession {
    client: HttpClient<'static, Tcp, DnsSocket<'static>>,
    response: &'static mut [u8],
}

impl InfluxSession {
    /// Can only be called once; the static state is taken here
    pub fn new(stack: Stack<'static>, seed: u64) -> Self {
        let tcp = TCP_CLIENT.init(TcpClient::new(stack, TCP_STATE.init(TcpClientState::new())));
        let dns = DNS.init(DnsSocket::new(stack));
        let SessionBuffers {
            tls_read,
            tls_write,
            response,
        } = BUFFERS.take();

        let tls = TlsConfig::new(seed, tls_read, tls_write, TlsVerify::None);
        Self {
            client: HttpClient::new_with_tls(tcp, dns, tls),
            response,
        }
    }
}

impl HttpSession for InfluxSession {
    type Error = reqwless::Error;

    async fn post(
        &mut self,
        request: &WriteRequest,
        body: &[u8],
    ) -> Result<HttpResponse, Self::Error> {
        let headers = request.headers();
        let mut handle = self
            .client
            .request(Method::POST, request.url())
            .await?
            .body(body)
            .headers(&headers);

        let response = handle.send(&mut *self.response).await?;
        let status = response.status.0;
        let text = response.body().read_to_end().await;
        if let Err(e) = &text {
            warn!("Unreadable response body (status {}): {:?}", status, e);
        }

        Ok(HttpResponse::with_body_result(status, text))
    }
}
