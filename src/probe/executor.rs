//! HTTP探测执行器
//!
//! 对单个端点执行一次HTTP请求，测量耗时，并把失败归约为分类结果。
//! 每次探测使用新建的连接，依次经过建连、TLS握手和等待响应头三个阶段，
//! 每个阶段有各自的时间预算，超时由所在阶段决定分类。

use crate::config::EndpointSpec;
use crate::error::Result;
use crate::probe::classifier::{classify, FaultKind, TransportFault};
use crate::probe::result::ProbeResult;
use crate::sink::ResultSink;
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use hyper::header::{HeaderName, HeaderValue, AUTHORIZATION, HOST, USER_AGENT};
use hyper::{Method, Request, Uri};
use hyper_util::rt::TokioIo;
use rustls::pki_types::ServerName;
use rustls::{ClientConfig, RootCertStore};
use std::error::Error as StdError;
use std::io::{self, ErrorKind};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::{TcpSocket, TcpStream};
use tokio::time::timeout;
use tokio_rustls::TlsConnector;
use tracing::{debug, warn};
use url::{Host, Position, Url};

/// 探测使用的固定超时
///
/// 这些值不由配置决定，保证单次探测的最坏耗时可预期。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeTimeouts {
    /// 域名解析加TCP建连超时
    pub dial: Duration,
    /// TCP keep-alive 间隔
    pub keep_alive: Duration,
    /// TLS握手超时，只对 https 目标生效
    pub tls_handshake: Duration,
    /// 请求发出后等待响应头超时
    pub response_header: Duration,
    /// `Expect: 100-continue` 等待时间，探测请求不带请求体，因此不会触发
    pub expect_continue: Duration,
}

impl Default for ProbeTimeouts {
    fn default() -> Self {
        Self {
            dial: Duration::from_secs(30),
            keep_alive: Duration::from_secs(30),
            tls_handshake: Duration::from_secs(10),
            response_header: Duration::from_secs(10),
            expect_continue: Duration::from_secs(1),
        }
    }
}

/// 单次探测中产生的错误，最终都会被分类为结果数据
#[derive(Error, Debug)]
pub enum ProbeError {
    /// 非法的HTTP方法
    #[error("invalid HTTP method {0:?}")]
    InvalidMethod(String),

    /// URL无法解析
    #[error("parse {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },

    /// 不支持的协议
    #[error("unsupported protocol scheme {0:?}")]
    UnsupportedScheme(String),

    /// 非法请求头
    #[error("invalid header {name:?}: {reason}")]
    InvalidHeader { name: String, reason: String },

    /// 域名解析失败
    #[error("lookup {host}: {source}")]
    Resolve {
        host: String,
        #[source]
        source: io::Error,
    },

    /// 域名没有任何地址
    #[error("lookup {0}: no addresses found")]
    NoAddress(String),

    /// 建连阶段超时
    #[error("dial tcp: i/o timeout (after {0:?})")]
    DialTimeout(Duration),

    /// TCP建连失败
    #[error("dial tcp: {0}")]
    Connect(#[source] io::Error),

    /// 主机名不能用作TLS服务器名
    #[error("invalid TLS server name {host:?}: {reason}")]
    InvalidServerName { host: String, reason: String },

    /// TLS握手超时
    #[error("TLS handshake timeout (after {0:?})")]
    TlsHandshakeTimeout(Duration),

    /// TLS握手失败
    #[error("tls: {0}")]
    Tls(#[source] io::Error),

    /// HTTP交换失败
    #[error(transparent)]
    Http(#[from] hyper::Error),

    /// 等待响应头超时
    #[error("timeout awaiting response headers (after {0:?})")]
    ResponseHeaderTimeout(Duration),
}

impl ProbeError {
    /// 转换为分类器的输入
    pub fn fault(&self) -> TransportFault {
        let message = self.to_string();
        match self {
            ProbeError::InvalidMethod(_) | ProbeError::InvalidHeader { .. } => {
                TransportFault::new(FaultKind::Other, message)
            }
            ProbeError::InvalidUrl { .. } | ProbeError::InvalidServerName { .. } => {
                TransportFault::new(FaultKind::InvalidAddress, message)
            }
            ProbeError::UnsupportedScheme(_) => TransportFault::new(FaultKind::UnknownNetwork, message),
            ProbeError::Resolve { source, .. } => {
                TransportFault::new(resolver_fault_kind(source), message)
            }
            ProbeError::NoAddress(_) => TransportFault::new(FaultKind::DnsResolution, message),
            ProbeError::DialTimeout(_) => {
                TransportFault::new(FaultKind::Operation, message).timed_out()
            }
            ProbeError::Connect(source) => io_fault(source, message),
            ProbeError::TlsHandshakeTimeout(_) | ProbeError::ResponseHeaderTimeout(_) => {
                TransportFault::new(FaultKind::Other, message).timed_out()
            }
            // 证书与协议错误由 rustls 给出，其余是连接本身的IO错误
            ProbeError::Tls(source) => match source.get_ref() {
                Some(inner) if inner.is::<rustls::Error>() => {
                    TransportFault::new(FaultKind::Other, message)
                }
                _ => io_fault(source, message),
            },
            ProbeError::Http(error) => http_fault(error, message),
        }
    }
}

/// 解析器自身配置有误时归为配置错误，否则为普通解析失败
///
/// 只检查解析器返回的错误文本，不包含被解析的主机名。
fn resolver_fault_kind(error: &io::Error) -> FaultKind {
    let text = error.to_string().to_lowercase();
    if text.contains("resolv.conf") || text.contains("nameserver") {
        FaultKind::DnsConfig
    } else {
        FaultKind::DnsResolution
    }
}

/// 按IO错误类型归类
fn io_fault(error: &io::Error, message: String) -> TransportFault {
    let kind = match error.kind() {
        ErrorKind::AddrNotAvailable | ErrorKind::AddrInUse => FaultKind::Address,
        ErrorKind::InvalidInput => FaultKind::InvalidAddress,
        _ => FaultKind::Operation,
    };
    let fault = TransportFault::new(kind, message);
    if error.kind() == ErrorKind::TimedOut {
        fault.timed_out()
    } else {
        fault
    }
}

/// hyper 错误：协议解析失败或底层IO错误，其余兜底
fn http_fault(error: &hyper::Error, message: String) -> TransportFault {
    if error.is_parse() || error.is_parse_status() {
        return TransportFault::new(FaultKind::Parse, message);
    }
    match io_source(error) {
        Some(io_error) => io_fault(io_error, message),
        None => TransportFault::new(FaultKind::Other, message),
    }
}

/// 在 source 链中查找第一个IO错误
fn io_source<'a>(error: &'a (dyn StdError + 'static)) -> Option<&'a io::Error> {
    let mut source = error.source();
    while let Some(cause) = source {
        if let Some(io_error) = cause.downcast_ref::<io::Error>() {
            return Some(io_error);
        }
        source = cause.source();
    }
    None
}

/// 请求的连接目标
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    /// 主机名或IP，IPv6 不带方括号
    pub host: String,
    /// 端口，未指定时取协议默认端口
    pub port: u16,
    /// 是否需要TLS
    pub tls: bool,
}

/// 已构建、尚未发送的请求
#[derive(Debug)]
pub struct PreparedRequest {
    pub target: Target,
    pub request: Request<String>,
}

/// 探测器trait，定义单次探测接口
#[async_trait]
pub trait Prober: Send + Sync {
    /// 对端点执行一次探测，失败也会以结果数据返回
    async fn probe(&self, endpoint: &EndpointSpec) -> ProbeResult;
}

/// 基于 hyper 与 rustls 的HTTP探测器
pub struct HttpProber {
    /// TLS连接器，各次探测共享根证书配置
    tls: TlsConnector,
    /// 超时设置
    timeouts: ProbeTimeouts,
}

impl HttpProber {
    /// 使用固定超时创建探测器
    pub fn new() -> Result<Self> {
        Self::with_timeouts(ProbeTimeouts::default())
    }

    /// 使用指定超时创建探测器
    ///
    /// # 参数
    /// * `timeouts` - 超时设置
    ///
    /// # 返回
    /// * `Result<Self>` - 探测器实例
    pub fn with_timeouts(timeouts: ProbeTimeouts) -> Result<Self> {
        let mut roots = RootCertStore::empty();
        roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());

        let provider = Arc::new(rustls::crypto::ring::default_provider());
        let mut config = ClientConfig::builder_with_provider(provider)
            .with_safe_default_protocol_versions()?
            .with_root_certificates(roots)
            .with_no_client_auth();
        config.alpn_protocols = vec![b"http/1.1".to_vec()];

        debug!(
            "HTTP探测器已创建: 建连超时 {:?}, keep-alive {:?}, TLS握手 {:?}, 响应头 {:?}, expect-continue {:?}",
            timeouts.dial,
            timeouts.keep_alive,
            timeouts.tls_handshake,
            timeouts.response_header,
            timeouts.expect_continue
        );

        Ok(Self {
            tls: TlsConnector::from(Arc::new(config)),
            timeouts,
        })
    }

    /// 构建HTTP请求
    ///
    /// 认证信息只在用户名或密码非空时附加；请求头按配置顺序追加，
    /// 同名请求头全部保留。
    pub fn build_request(
        &self,
        endpoint: &EndpointSpec,
    ) -> std::result::Result<PreparedRequest, ProbeError> {
        let method_name = endpoint.method.trim().to_uppercase();
        let method = if method_name.is_empty() {
            Method::GET
        } else {
            Method::from_bytes(method_name.as_bytes())
                .map_err(|_| ProbeError::InvalidMethod(endpoint.method.clone()))?
        };

        let invalid_url = |reason: String| ProbeError::InvalidUrl {
            url: endpoint.url.clone(),
            reason,
        };

        let url = Url::parse(&endpoint.url).map_err(|e| invalid_url(e.to_string()))?;
        let tls = match url.scheme() {
            "http" => false,
            "https" => true,
            other => return Err(ProbeError::UnsupportedScheme(other.to_string())),
        };
        let host = match url.host() {
            Some(Host::Domain(domain)) => domain.to_string(),
            Some(Host::Ipv4(addr)) => addr.to_string(),
            Some(Host::Ipv6(addr)) => addr.to_string(),
            None => return Err(invalid_url("missing host".to_string())),
        };
        let port = url
            .port_or_known_default()
            .unwrap_or(if tls { 443 } else { 80 });

        let uri = url[Position::BeforePath..Position::AfterQuery]
            .parse::<Uri>()
            .map_err(|e| invalid_url(e.to_string()))?;
        let authority = HeaderValue::from_str(&url[Position::BeforeHost..Position::AfterPort])
            .map_err(|e| invalid_url(e.to_string()))?;

        let mut request = Request::new(String::new());
        *request.method_mut() = method;
        *request.uri_mut() = uri;
        let headers = request.headers_mut();
        headers.insert(HOST, authority);
        headers.insert(
            USER_AGENT,
            HeaderValue::from_static(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"))),
        );

        if let Some(auth) = endpoint.credentials() {
            let token = STANDARD.encode(format!("{}:{}", auth.username, auth.password));
            let value = HeaderValue::try_from(format!("Basic {token}")).map_err(|e| {
                ProbeError::InvalidHeader {
                    name: AUTHORIZATION.to_string(),
                    reason: e.to_string(),
                }
            })?;
            headers.insert(AUTHORIZATION, value);
        }

        for header in &endpoint.headers {
            let name = HeaderName::from_bytes(header.name.as_bytes()).map_err(|e| {
                ProbeError::InvalidHeader {
                    name: header.name.clone(),
                    reason: e.to_string(),
                }
            })?;
            let value = HeaderValue::from_str(&header.value).map_err(|e| ProbeError::InvalidHeader {
                name: header.name.clone(),
                reason: e.to_string(),
            })?;
            // Host 只能有一个，配置值覆盖URL中的主机
            if name == HOST {
                headers.insert(name, value);
            } else {
                headers.append(name, value);
            }
        }

        Ok(PreparedRequest {
            target: Target { host, port, tls },
            request,
        })
    }

    /// 建立连接并发送请求，返回响应状态码
    async fn send(&self, prepared: PreparedRequest) -> std::result::Result<u16, ProbeError> {
        let PreparedRequest { target, request } = prepared;
        let stream = self.dial(&target).await?;

        if target.tls {
            let stream = self.handshake(&target, stream).await?;
            self.exchange(stream, request).await
        } else {
            self.exchange(stream, request).await
        }
    }

    /// 解析并建立TCP连接，受 `dial` 预算约束
    async fn dial(&self, target: &Target) -> std::result::Result<TcpStream, ProbeError> {
        let budget = self.timeouts.dial;
        match timeout(budget, connect_target(target)).await {
            Ok(result) => result,
            Err(_) => Err(ProbeError::DialTimeout(budget)),
        }
    }

    /// 在已建立的连接上完成TLS握手，受 `tls_handshake` 预算约束
    async fn handshake(
        &self,
        target: &Target,
        stream: TcpStream,
    ) -> std::result::Result<tokio_rustls::client::TlsStream<TcpStream>, ProbeError> {
        let server_name =
            ServerName::try_from(target.host.clone()).map_err(|e| ProbeError::InvalidServerName {
                host: target.host.clone(),
                reason: e.to_string(),
            })?;

        let budget = self.timeouts.tls_handshake;
        match timeout(budget, self.tls.connect(server_name, stream)).await {
            Ok(Ok(stream)) => Ok(stream),
            Ok(Err(e)) => Err(ProbeError::Tls(e)),
            Err(_) => Err(ProbeError::TlsHandshakeTimeout(budget)),
        }
    }

    /// 发送请求并等待响应头，受 `response_header` 预算约束
    async fn exchange<S>(&self, stream: S, request: Request<String>) -> std::result::Result<u16, ProbeError>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let (mut sender, connection) = hyper::client::conn::http1::handshake(TokioIo::new(stream)).await?;
        tokio::spawn(async move {
            if let Err(e) = connection.await {
                debug!("连接关闭: {}", e);
            }
        });

        let budget = self.timeouts.response_header;
        match timeout(budget, sender.send_request(request)).await {
            Ok(Ok(response)) => Ok(response.status().as_u16()),
            Ok(Err(e)) => Err(ProbeError::Http(e)),
            Err(_) => Err(ProbeError::ResponseHeaderTimeout(budget)),
        }
    }
}

/// 解析目标地址并依次尝试连接，返回第一个成功的连接
async fn connect_target(target: &Target) -> std::result::Result<TcpStream, ProbeError> {
    let addrs: Vec<SocketAddr> = tokio::net::lookup_host((target.host.as_str(), target.port))
        .await
        .map_err(|source| ProbeError::Resolve {
            host: target.host.clone(),
            source,
        })?
        .collect();

    let mut last_error = None;
    for addr in addrs {
        match connect_socket(addr).await {
            Ok(stream) => return Ok(stream),
            Err(e) => {
                debug!("连接 {} 失败: {}", addr, e);
                last_error = Some(e);
            }
        }
    }

    match last_error {
        Some(e) => Err(ProbeError::Connect(e)),
        None => Err(ProbeError::NoAddress(target.host.clone())),
    }
}

/// 开启 keep-alive 后连接单个地址
async fn connect_socket(addr: SocketAddr) -> io::Result<TcpStream> {
    let socket = if addr.is_ipv4() {
        TcpSocket::new_v4()?
    } else {
        TcpSocket::new_v6()?
    };
    socket.set_keepalive(true)?;
    let stream = socket.connect(addr).await?;
    stream.set_nodelay(true)?;
    Ok(stream)
}

#[async_trait]
impl Prober for HttpProber {
    async fn probe(&self, endpoint: &EndpointSpec) -> ProbeResult {
        let start_time = Instant::now();

        let outcome = match self.build_request(endpoint) {
            Ok(prepared) => self.send(prepared).await,
            Err(e) => Err(e),
        };

        let elapsed = start_time.elapsed();

        match outcome {
            Ok(status_code) => ProbeResult::success(endpoint.name.clone(), status_code, elapsed),
            Err(error) => {
                let fault = error.fault();
                if fault.kind == FaultKind::Other && !fault.timeout {
                    warn!("未识别的探测错误 {}: {}", endpoint.name, error);
                }
                ProbeResult::failure(endpoint.name.clone(), classify(&fault), elapsed)
            }
        }
    }
}

/// 执行一次探测：结果写入日志，返回控制台显示行
pub async fn execute(prober: &dyn Prober, sink: &dyn ResultSink, endpoint: &EndpointSpec) -> String {
    let result = prober.probe(endpoint).await;
    sink.log_result(&result);
    result.display_line()
}
