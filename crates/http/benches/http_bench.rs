use bytes::{Bytes, BytesMut};
use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;
use futures::executor::block_on;
use std::sync::Arc;
use switchyard_http::codec::{RequestDecoder, ResponseEncoder};
use switchyard_http::connection::{ConnectionSettings, HttpConnection};
use switchyard_http::date::DateService;
use switchyard_http::handler::make_handler;
use switchyard_http::protocol::{HandlerError, Header, Message, PayloadSize, Request, Response, ResponseFrame, StatusCode};
use tokio_util::codec::{Decoder, Encoder};

const REQUEST: &[u8] = b"GET /users/42?fields=name HTTP/1.1\r\nHost: localhost\r\nUser-Agent: bench\r\nAccept: */*\r\n\r\n";

fn bench_request_decoder(c: &mut Criterion) {
    c.bench_function("decode_simple_request", |b| {
        b.iter(|| {
            let mut decoder = RequestDecoder::new();
            let mut bytes = BytesMut::from(REQUEST);
            while let Some(item) = decoder.decode(&mut bytes).unwrap() {
                black_box(item);
            }
        });
    });
}

fn bench_response_encoder(c: &mut Criterion) {
    c.bench_function("encode_simple_response", |b| {
        b.iter(|| {
            let response = Response::ok().header(Header::from_static("Content-Type", "text/plain"));
            let (head, _body) = response.into_parts();
            let frame = ResponseFrame {
                head,
                server: Bytes::from_static(b"switchyard"),
                date: Bytes::from_static(b"Thu, 01 Jan 1970 00:00:00 GMT"),
                payload_size: PayloadSize::Length(12),
            };
            let mut encoder = ResponseEncoder::new();
            let mut bytes = BytesMut::new();
            encoder.encode(Message::<_, Bytes>::Header(frame), &mut bytes).unwrap();
            black_box(bytes);
        });
    });
}

fn bench_http_connection(c: &mut Criterion) {
    let handler = Arc::new(make_handler(|_request: Request| async move {
        Ok::<_, HandlerError>(Response::text(StatusCode::OK, "Hello World!"))
    }));
    let settings = Arc::new(ConnectionSettings::new("switchyard", DateService::fixed("Thu, 01 Jan 1970 00:00:00 GMT")));

    c.bench_function("process_simple_request", |b| {
        b.iter(|| {
            let connection = HttpConnection::new(REQUEST, Vec::with_capacity(256), Arc::clone(&settings));
            block_on(connection.process(Arc::clone(&handler))).unwrap();
        });
    });
}

criterion_group!(benches, bench_request_decoder, bench_response_encoder, bench_http_connection);
criterion_main!(benches);
