//! Larger grammars built from the public API, the way a protocol crate
//! would use them.

use std::{collections::HashMap, thread};

use lazy_static::lazy_static;
use pretty_assertions::assert_eq;
use rivet::{
    action, attr_bool, bits, bumpalo::Bump, ch, choice, ignore, length_value, many, middle,
    sep_by, sequence, uint16, uint32, uint8, with_endianness, Endianness, Indirect, ParseError,
    ParseOptions, ParseResult, Parser, Records, Token,
};

struct Packets;

impl Records for Packets {
    type Record<'a> = Packet<'a>;
}

#[derive(Debug, PartialEq)]
enum Packet<'a> {
    Header { version: u64, kind: u64, count: u64 },
    Option { code: u64, value: OptionValue<'a> },
}

#[derive(Debug, PartialEq)]
enum OptionValue<'a> {
    Mtu(u64),
    Flags(&'a [Token<'a, Packets>]),
    Opaque(&'a [u8]),
}

/// Per-code grammars for option payloads.
fn option_table() -> HashMap<u64, Parser<Packets>> {
    let mut table = HashMap::new();
    table.insert(1, uint16());
    table.insert(2, many(bits(1, false)));
    table
}

fn act_option<'a>(
    table: &HashMap<u64, Parser<Packets>>,
    res: &ParseResult<'a, Packets>,
) -> Option<Token<'a, Packets>> {
    let [code, payload] = res.ast().as_array::<2>()?;
    let code = code.as_uint()?;
    let raw: Vec<u8> = payload.seq_bytes()?.collect();

    let opts = ParseOptions::default().require_end(true);
    let parsed = table
        .get(&code)
        .and_then(|g| g.parse_with(&raw, res.arena(), &opts).ok())
        .map(|r| r.ast());
    let value = match (code, parsed) {
        (1, Some(mtu)) => OptionValue::Mtu(mtu.as_uint()?),
        (2, Some(flags)) => OptionValue::Flags(flags.as_seq()?),
        _ => OptionValue::Opaque(res.arena().alloc_slice_copy(&raw)),
    };
    Some(res.make_user(Packet::Option { code, value }))
}

fn packet_grammar() -> Parser<Packets> {
    // Three reserved bits that must be zero.
    let reserved = ignore(attr_bool(bits(3, false), |res| res.ast().as_uint() == Some(0)));

    let header = action(
        sequence(vec![bits(4, false), reserved, bits(1, false), uint8()]),
        |res| {
            let [version, kind, count] = res.ast().as_array::<3>()?;
            Some(res.make_user(Packet::Header {
                version: version.as_uint()?,
                kind: kind.as_uint()?,
                count: count.as_uint()?,
            }))
        },
    );

    let table = option_table();
    let option = action(
        sequence(vec![uint8(), length_value(uint8(), uint8())]),
        move |res| act_option(&table, res),
    );

    // The header's count must match the number of options.
    attr_bool(sequence(vec![header, many(option)]), |res| {
        let declared = match res.ast().field(0).and_then(Token::user) {
            Some(Packet::Header { count, .. }) => *count,
            _ => return false,
        };
        let actual = res.ast().field(1).and_then(Token::as_seq).map(<[_]>::len);
        actual == Some(declared as usize)
    })
}

lazy_static! {
    static ref PACKET: Parser<Packets> = packet_grammar();
}

const SAMPLE: &[u8] = &[
    0b0011_0001, // version 3, reserved, kind 1
    3,           // three options
    1, 2, 0x05, 0xdc, // MTU 1500
    2, 1, 0b1010_0000, // flags
    9, 2, 0xca, 0xfe, // unknown code
];

#[test]
fn test_packet() {
    let bump = Bump::new();
    let res = PACKET.parse(SAMPLE, &bump).unwrap();
    assert_eq!(res.bit_length(), SAMPLE.len() as u64 * 8);

    let [header, options] = res.ast().as_array::<2>().unwrap();
    assert_eq!(
        header.user(),
        Some(&Packet::Header {
            version: 3,
            kind: 1,
            count: 3
        })
    );

    let options = options.as_seq().unwrap();
    assert_eq!(
        options[0].user(),
        Some(&Packet::Option {
            code: 1,
            value: OptionValue::Mtu(1500)
        })
    );

    let flags = match options[1].user() {
        Some(Packet::Option {
            value: OptionValue::Flags(flags),
            ..
        }) => flags.iter().map(|f| f.as_uint().unwrap()).collect::<Vec<_>>(),
        other => panic!("expected flags, got {:?}", other),
    };
    assert_eq!(flags, [1, 0, 1, 0, 0, 0, 0, 0]);

    assert_eq!(
        options[2].user(),
        Some(&Packet::Option {
            code: 9,
            value: OptionValue::Opaque(&[0xca, 0xfe])
        })
    );
}

#[test]
fn test_packet_validation() {
    let bump = Bump::new();

    let mut bad_reserved = SAMPLE.to_vec();
    bad_reserved[0] |= 0b0000_0100;
    assert!(PACKET.parse(&bad_reserved, &bump).is_none());

    let mut bad_count = SAMPLE.to_vec();
    bad_count[1] = 4;
    assert!(PACKET.parse(&bad_count, &bump).is_none());

    // An MTU option with a one-byte payload is kept as opaque bytes.
    let short_mtu = [0b0011_0001, 1, 1, 1, 0x05];
    let res = PACKET.parse(&short_mtu, &bump).unwrap();
    let option = res.ast().field(1).and_then(|o| o.field(0)).copied();
    assert_eq!(
        option.and_then(|o| o.user()),
        Some(&Packet::Option {
            code: 1,
            value: OptionValue::Opaque(&[0x05])
        })
    );
}

#[test]
fn test_shared_across_threads() {
    let handles: Vec<_> = (0..4)
        .map(|i| {
            thread::spawn(move || {
                let mut input = SAMPLE.to_vec();
                input[4] = i;
                // Each thread parses with its own arena.
                let bump = Bump::new();
                let res = PACKET.parse(&input, &bump)?;
                let mtu = match res.ast().field(1)?.field(0)?.user()? {
                    Packet::Option {
                        value: OptionValue::Mtu(mtu),
                        ..
                    } => *mtu,
                    _ => return None,
                };
                Some(mtu)
            })
        })
        .collect();

    let mtus: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert_eq!(
        mtus,
        [Some(0x00dc), Some(0x01dc), Some(0x02dc), Some(0x03dc)]
    );
}

#[test]
fn test_mixed_endianness() {
    let bump = Bump::new();
    // A little-endian length, then big-endian values.
    let p: Parser = sequence(vec![
        with_endianness(Endianness::LITTLE, uint32()),
        sep_by(uint16(), ch(b',')),
    ]);
    let res = p.parse(&[0x01, 0x00, 0x00, 0x00, 0x12, 0x34], &bump).unwrap();
    assert_eq!(res.ast().field(0), Some(&Token::uint(1, 32)));
    assert_eq!(res.ast().field(1).and_then(|s| s.field(0)), Some(&Token::uint(0x1234, 16)));

    let little = ParseOptions::default().endianness(Endianness::LITTLE);
    let res = uint16::<()>().parse_with(&[0x34, 0x12], &bump, &little).unwrap();
    assert_eq!(res.ast(), Token::uint(0x1234, 16));
}

#[test]
fn test_recursive_list() {
    // list = "[" (list | digit) {"," (list | digit)} "]"
    let list: Indirect = Indirect::new();
    let item = choice(vec![list.parser(), action(uint8(), |res| {
        let d = res.ast().as_uint()?;
        (b'0'..=b'9').contains(&(d as u8)).then(|| Token::uint(d - u64::from(b'0'), 8))
    })]);
    let grammar: Parser = middle(ch(b'['), sep_by(item, ch(b',')), ch(b']'));
    list.bind(&grammar).unwrap();

    let bump = Bump::new();
    let res = grammar.parse(b"[1,[2,[]],3]", &bump).unwrap();
    let ast = res.ast();
    assert_eq!(ast.as_seq().map(<[_]>::len), Some(3));
    assert_eq!(ast.field(0), Some(&Token::uint(1, 8)));
    assert_eq!(
        ast.field(1).and_then(|l| l.field(1)).and_then(|l| l.as_seq()).map(<[_]>::len),
        Some(0)
    );

    let opts = ParseOptions::default().require_end(true);
    assert!(matches!(
        grammar.parse_with(b"[1,[2]", &bump, &opts),
        Err(ParseError::Overrun { .. })
    ));
}
