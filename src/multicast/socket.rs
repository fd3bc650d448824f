//! Multicast socket plumbing.
//!
//! Binds the listening and sending halves of a group membership and
//! adapts them to the byte-stream interfaces of the frame codec while
//! keeping one frame per datagram: the writer sends each frame as one
//! datagram, the reader never hands out bytes of two datagrams in a
//! single read.

use std::io;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::pin::Pin;
use std::task::{ready, Context, Poll};

use socket2::{Domain, Protocol, Socket, Type};
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::net::UdpSocket;

use crate::core::RECEIVE_BUFFER_SIZE;

/// Joins `group` and returns a socket receiving its datagrams.
///
/// SO_REUSEADDR (plus SO_REUSEPORT where available) lets several group
/// members coexist on one host; binding to the group address keeps
/// unrelated traffic out.
pub(super) fn listen(group: SocketAddrV4) -> io::Result<UdpSocket> {
    let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))?;
    socket.set_reuse_address(true)?;
    #[cfg(unix)]
    socket.set_reuse_port(true)?;
    socket.bind(&SocketAddr::V4(group).into())?;
    socket.join_multicast_v4(group.ip(), &Ipv4Addr::UNSPECIFIED)?;
    socket.set_nonblocking(true)?;
    UdpSocket::from_std(socket.into())
}

/// Returns a socket connected to `group` for sends, with multicast
/// loopback enabled so members on the sending host receive the datagrams
/// too.
pub(super) fn dial(group: SocketAddrV4) -> io::Result<UdpSocket> {
    let socket = std::net::UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0))?;
    socket.set_multicast_loop_v4(true)?;
    socket.connect(SocketAddr::V4(group))?;
    socket.set_nonblocking(true)?;
    UdpSocket::from_std(socket)
}

/// Byte-stream reads over a datagram socket.
///
/// Buffers one datagram at a time and serves reads from it, so the exact-
/// length reads of the frame codec stay aligned with datagram boundaries.
pub(super) struct DatagramReader {
    socket: UdpSocket,
    datagram: Box<[u8]>,
    start: usize,
    end: usize,
}

impl DatagramReader {
    pub(super) fn new(socket: UdpSocket) -> Self {
        Self {
            socket,
            datagram: vec![0u8; RECEIVE_BUFFER_SIZE].into_boxed_slice(),
            start: 0,
            end: 0,
        }
    }
}

impl AsyncRead for DatagramReader {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();

        if this.start >= this.end {
            let mut datagram = ReadBuf::new(&mut this.datagram);
            ready!(this.socket.poll_recv(cx, &mut datagram))?;
            this.start = 0;
            this.end = datagram.filled().len();
        }

        let n = buf.remaining().min(this.end - this.start);
        buf.put_slice(&this.datagram[this.start..this.start + n]);
        this.start += n;
        Poll::Ready(Ok(()))
    }
}

/// Byte-stream writes over a connected datagram socket; every write goes
/// out as one datagram.
pub(super) struct DatagramWriter {
    socket: UdpSocket,
}

impl DatagramWriter {
    pub(super) fn new(socket: UdpSocket) -> Self {
        Self { socket }
    }
}

impl AsyncWrite for DatagramWriter {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        self.get_mut().socket.poll_send(cx, buf)
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}
