//! Parses a DNS message (RFC 1035, without name compression) and prints it.
//!
//! The message is given as hex, either as the first argument or on stdin:
//!
//! ```text
//! cargo run --example dns -- 'abcd 0100 0001 0000 0000 0000 076578616d706c6503636f6d00 0001 0001'
//! ```
//!
//! Set `RUST_LOG=rivet=trace` to watch the parser backtrack.

use std::{
    collections::HashMap,
    fmt,
    io::Read,
    net::Ipv4Addr,
    sync::Arc,
};

use rivet::{
    action, attr_bool, bits, bumpalo::Bump, ch, choice, ignore, int_range, left, length_value,
    many, many1, repeat_n, sequence, uint16, uint32, uint8, ParseOptions, ParseResult, Parser,
    Records, Token,
};
use tracing::{debug, info};

struct Dns;

impl Records for Dns {
    type Record<'a> = Record<'a>;
}

#[derive(Debug, PartialEq)]
enum Record<'a> {
    Header(Header),
    Name(Name<'a>),
    Question(Question<'a>),
    Rr(ResourceRecord<'a>),
    RData(RData<'a>),
}

#[derive(Copy, Clone, Debug, PartialEq)]
struct Header {
    id: u16,
    qr: bool,
    opcode: u8,
    aa: bool,
    tc: bool,
    rd: bool,
    ra: bool,
    rcode: u8,
    question_count: u16,
    answer_count: u16,
    authority_count: u16,
    additional_count: u16,
}

#[derive(Copy, Clone, Debug, PartialEq)]
struct Name<'a> {
    labels: &'a [&'a [u8]],
}

impl fmt::Display for Name<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.labels.is_empty() {
            return write!(f, ".");
        }
        for label in self.labels {
            write!(f, "{}.", label.escape_ascii())?;
        }
        Ok(())
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
struct Question<'a> {
    name: Name<'a>,
    qtype: u16,
    qclass: u16,
}

#[derive(Copy, Clone, Debug, PartialEq)]
enum RData<'a> {
    A(Ipv4Addr),
    Name(Name<'a>),
    Soa {
        mname: Name<'a>,
        rname: Name<'a>,
        serial: u32,
        refresh: u32,
        retry: u32,
        expire: u32,
        minimum: u32,
    },
    Hinfo {
        cpu: &'a [u8],
        os: &'a [u8],
    },
    Mx {
        preference: u16,
        exchange: Name<'a>,
    },
    Txt(&'a [&'a [u8]]),
    /// A type without a grammar, or data that did not parse.
    Raw(&'a [u8]),
}

impl fmt::Display for RData<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RData::A(addr) => write!(f, "{}", addr),
            RData::Name(name) => write!(f, "{}", name),
            RData::Soa {
                mname,
                rname,
                serial,
                refresh,
                retry,
                expire,
                minimum,
            } => write!(
                f,
                "{} {} {} {} {} {} {}",
                mname, rname, serial, refresh, retry, expire, minimum
            ),
            RData::Hinfo { cpu, os } => {
                write!(f, "\"{}\" \"{}\"", cpu.escape_ascii(), os.escape_ascii())
            }
            RData::Mx {
                preference,
                exchange,
            } => write!(f, "{} {}", preference, exchange),
            RData::Txt(strings) => {
                for (i, s) in strings.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "\"{}\"", s.escape_ascii())?;
                }
                Ok(())
            }
            RData::Raw(data) => {
                write!(f, "\\# {}", data.len())?;
                for b in data.iter() {
                    write!(f, " {:02x}", b)?;
                }
                Ok(())
            }
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
struct ResourceRecord<'a> {
    name: Name<'a>,
    rtype: u16,
    class: u16,
    ttl: u32,
    rdata: RData<'a>,
}

#[derive(Copy, Clone, Debug, PartialEq)]
struct Message<'a> {
    header: Header,
    questions: &'a [Question<'a>],
    answers: &'a [ResourceRecord<'a>],
    authority: &'a [ResourceRecord<'a>],
    additional: &'a [ResourceRecord<'a>],
}

impl fmt::Display for Message<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let h = &self.header;
        writeln!(
            f,
            ";; id {} opcode {} rcode {} flags{}{}{}{}{}",
            h.id,
            h.opcode,
            h.rcode,
            if h.qr { " qr" } else { "" },
            if h.aa { " aa" } else { "" },
            if h.tc { " tc" } else { "" },
            if h.rd { " rd" } else { "" },
            if h.ra { " ra" } else { "" },
        )?;

        writeln!(f, ";; QUESTION")?;
        for q in self.questions {
            writeln!(f, ";{}\t{}\t{}", q.name, q.qclass, q.qtype)?;
        }

        let sections = [
            ("ANSWER", self.answers),
            ("AUTHORITY", self.authority),
            ("ADDITIONAL", self.additional),
        ];
        for (title, rrs) in sections {
            if rrs.is_empty() {
                continue;
            }
            writeln!(f, ";; {}", title)?;
            for rr in rrs {
                writeln!(
                    f,
                    "{}\t{}\t{}\t{}\t{}",
                    rr.name, rr.ttl, rr.class, rr.rtype, rr.rdata
                )?;
            }
        }
        Ok(())
    }
}

type DnsToken<'a> = Token<'a, Dns>;

fn uint_field(tok: &DnsToken, i: usize) -> Option<u64> {
    tok.field(i)?.as_uint()
}

fn name_of<'a>(tok: &DnsToken<'a>) -> Option<Name<'a>> {
    match tok.user()? {
        Record::Name(name) => Some(*name),
        _ => None,
    }
}

fn flag(v: &DnsToken) -> Option<bool> {
    Some(v.as_uint()? != 0)
}

fn act_header<'a>(res: &ParseResult<'a, Dns>) -> Option<DnsToken<'a>> {
    let [id, qr, opcode, aa, tc, rd, ra, rcode, qd, an, ns, ar] = res.ast().as_array::<12>()?;
    let narrow = |t: &DnsToken| u16::try_from(t.as_uint()?).ok();
    Some(res.make_user(Record::Header(Header {
        id: narrow(id)?,
        qr: flag(qr)?,
        opcode: opcode.as_uint()? as u8,
        aa: flag(aa)?,
        tc: flag(tc)?,
        rd: flag(rd)?,
        ra: flag(ra)?,
        rcode: rcode.as_uint()? as u8,
        question_count: narrow(qd)?,
        answer_count: narrow(an)?,
        authority_count: narrow(ns)?,
        additional_count: narrow(ar)?,
    })))
}

fn act_character_string<'a>(res: &ParseResult<'a, Dns>) -> Option<DnsToken<'a>> {
    Some(res.make_bytes(res.ast().seq_bytes()?))
}

fn act_name<'a>(res: &ParseResult<'a, Dns>) -> Option<DnsToken<'a>> {
    let labels = res
        .ast()
        .as_seq()?
        .iter()
        .map(Token::as_bytes)
        .collect::<Option<Vec<_>>>()?;
    let labels = res.alloc_slice(labels);
    Some(res.make_user(Record::Name(Name { labels })))
}

fn act_question<'a>(res: &ParseResult<'a, Dns>) -> Option<DnsToken<'a>> {
    let ast = res.ast();
    Some(res.make_user(Record::Question(Question {
        name: name_of(ast.field(0)?)?,
        qtype: uint_field(&ast, 1)? as u16,
        qclass: uint_field(&ast, 2)? as u16,
    })))
}

type DecodeFn = for<'t> fn(&DnsToken<'t>) -> Option<RData<'t>>;

fn rdata(p: Parser<Dns>, decode: DecodeFn) -> Parser<Dns> {
    action(p, move |res| {
        let data = decode(&res.ast())?;
        Some(res.make_user(Record::RData(data)))
    })
}

/// Grammars for the RDATA of each supported record type, keyed by type.
struct RDataTable {
    grammars: HashMap<u16, Parser<Dns>>,
}

impl RDataTable {
    fn new(name: &Parser<Dns>, character_string: &Parser<Dns>) -> Self {
        let mut grammars = HashMap::new();

        grammars.insert(
            1,
            rdata(uint32(), |t| Some(RData::A(Ipv4Addr::from(t.as_uint()? as u32)))),
        );

        let domain = rdata(name.clone(), |t| Some(RData::Name(name_of(t)?)));
        // NS, MD, MF, CNAME, MB, MG, MR, PTR
        for rtype in [2, 3, 4, 5, 7, 8, 9, 12] {
            grammars.insert(rtype, domain.clone());
        }

        grammars.insert(
            6,
            rdata(
                sequence(vec![
                    name.clone(),
                    name.clone(),
                    uint32(),
                    uint32(),
                    uint32(),
                    uint32(),
                    uint32(),
                ]),
                |t| {
                    let n = |i| Some(uint_field(t, i)? as u32);
                    Some(RData::Soa {
                        mname: name_of(t.field(0)?)?,
                        rname: name_of(t.field(1)?)?,
                        serial: n(2)?,
                        refresh: n(3)?,
                        retry: n(4)?,
                        expire: n(5)?,
                        minimum: n(6)?,
                    })
                },
            ),
        );

        grammars.insert(
            13,
            rdata(
                sequence(vec![character_string.clone(), character_string.clone()]),
                |t| {
                    Some(RData::Hinfo {
                        cpu: t.field(0)?.as_bytes()?,
                        os: t.field(1)?.as_bytes()?,
                    })
                },
            ),
        );

        grammars.insert(
            15,
            rdata(sequence(vec![uint16(), name.clone()]), |t| {
                Some(RData::Mx {
                    preference: uint_field(t, 0)? as u16,
                    exchange: name_of(t.field(1)?)?,
                })
            }),
        );

        grammars.insert(
            16,
            action(many1(character_string.clone()), |res| {
                let strings = res
                    .ast()
                    .as_seq()?
                    .iter()
                    .map(Token::as_bytes)
                    .collect::<Option<Vec<_>>>()?;
                Some(res.make_user(Record::RData(RData::Txt(res.alloc_slice(strings)))))
            }),
        );

        RDataTable { grammars }
    }

    /// Parses `raw` with the grammar for `rtype`, falling back to raw bytes.
    fn parse<'a>(&self, rtype: u16, raw: &[u8], arena: &'a Bump) -> RData<'a> {
        let opts = ParseOptions::default().require_end(true);
        let parsed = self
            .grammars
            .get(&rtype)
            .and_then(|g| g.parse_with(raw, arena, &opts).ok());

        match parsed.as_ref().and_then(|res| res.ast().user()) {
            Some(Record::RData(data)) => *data,
            _ => {
                debug!(rtype, len = raw.len(), "keeping undecoded rdata");
                RData::Raw(arena.alloc_slice_copy(raw))
            }
        }
    }
}

/// The compiled grammar, built once and shared by every parse.
struct DnsGrammar {
    question: Parser<Dns>,
    rr: Parser<Dns>,
    message: Parser<Dns>,
}

impl DnsGrammar {
    fn new() -> Self {
        // Z: reserved, must be zero.
        let hdzero = ignore(attr_bool(bits(3, false), |res| res.ast().as_uint() == Some(0)));

        let header = action(
            sequence(vec![
                bits(16, false), // ID
                bits(1, false),  // QR
                bits(4, false),  // OPCODE
                bits(1, false),  // AA
                bits(1, false),  // TC
                bits(1, false),  // RD
                bits(1, false),  // RA
                hdzero,
                bits(4, false), // RCODE
                uint16(),       // QDCOUNT
                uint16(),       // ANCOUNT
                uint16(),       // NSCOUNT
                uint16(),       // ARCOUNT
            ]),
            act_header,
        );

        let rtype = int_range(uint16(), 1, 16);
        let qtype = choice(vec![rtype.clone(), int_range(uint16(), 252, 255)]);
        let class = int_range(uint16(), 1, 4);
        let qclass = choice(vec![class.clone(), int_range(uint16(), 255, 255)]);

        let label = action(
            length_value(int_range(uint8(), 1, 63), uint8()),
            act_character_string,
        );
        let name = action(left(many(label), ch(0)), act_name);
        let character_string = action(length_value(uint8(), uint8()), act_character_string);

        let question = action(sequence(vec![name.clone(), qtype, qclass]), act_question);

        let table = Arc::new(RDataTable::new(&name, &character_string));
        let rr = action(
            sequence(vec![
                name,
                rtype,
                class,
                uint32(),                         // TTL
                length_value(uint16(), uint8()), // RDLENGTH, RDATA
            ]),
            move |res| {
                let ast = res.ast();
                let ty = uint_field(&ast, 1)? as u16;
                let raw: Vec<u8> = ast.field(4)?.seq_bytes()?.collect();
                Some(res.make_user(Record::Rr(ResourceRecord {
                    name: name_of(ast.field(0)?)?,
                    rtype: ty,
                    class: uint_field(&ast, 2)? as u16,
                    ttl: uint_field(&ast, 3)? as u32,
                    rdata: table.parse(ty, &raw, res.arena()),
                })))
            },
        );

        // The header's counts decide how the rest is split into sections.
        let message = sequence(vec![header, many(uint8())]);

        DnsGrammar {
            question,
            rr,
            message,
        }
    }

    fn parse<'a>(&self, input: &[u8], arena: &'a Bump) -> Option<Message<'a>> {
        let res = self.message.parse(input, arena)?;
        let [header, rest] = res.ast().as_array::<2>()?;
        let header = match header.user()? {
            Record::Header(h) => *h,
            _ => return None,
        };
        let rest: Vec<u8> = rest.seq_bytes()?.collect();

        let rr_count = usize::from(header.answer_count)
            + usize::from(header.authority_count)
            + usize::from(header.additional_count);
        let sections: Parser<Dns> = sequence(vec![
            repeat_n(self.question.clone(), usize::from(header.question_count)),
            repeat_n(self.rr.clone(), rr_count),
        ]);
        let validated = attr_bool(sections, move |res| validate_sections(&header, res));

        let opts = ParseOptions::default().require_end(true);
        let body = match validated.parse_with(&rest, arena, &opts) {
            Ok(body) => body.ast(),
            Err(e) => {
                info!(%e, "message sections did not parse");
                return None;
            }
        };

        let questions = body
            .field(0)?
            .as_seq()?
            .iter()
            .map(|t| match t.user()? {
                Record::Question(q) => Some(*q),
                _ => None,
            })
            .collect::<Option<Vec<_>>>()?;
        let rrs = body
            .field(1)?
            .as_seq()?
            .iter()
            .map(|t| match t.user()? {
                Record::Rr(rr) => Some(*rr),
                _ => None,
            })
            .collect::<Option<Vec<_>>>()?;

        let rrs: &'a [ResourceRecord<'a>] = arena.alloc_slice_copy(&rrs);
        let (answers, rest) = rrs.split_at(usize::from(header.answer_count));
        let (authority, additional) = rest.split_at(usize::from(header.authority_count));

        Some(Message {
            header,
            questions: arena.alloc_slice_copy(&questions),
            answers,
            authority,
            additional,
        })
    }
}

/// Every message carries as many questions and records as its header says.
fn validate_sections(header: &Header, res: &ParseResult<Dns>) -> bool {
    let len = |i| res.ast().field(i).and_then(Token::as_seq).map(<[_]>::len);
    let rrs = usize::from(header.answer_count)
        + usize::from(header.authority_count)
        + usize::from(header.additional_count);
    len(0) == Some(usize::from(header.question_count)) && len(1) == Some(rrs)
}

fn decode_hex(text: &str) -> Result<Vec<u8>, String> {
    let digits: Vec<u8> = text.bytes().filter(|b| !b.is_ascii_whitespace()).collect();
    if digits.len() % 2 != 0 {
        return Err("odd number of hex digits".to_owned());
    }
    digits
        .chunks(2)
        .map(|pair| {
            let s = std::str::from_utf8(pair).map_err(|e| e.to_string())?;
            u8::from_str_radix(s, 16).map_err(|e| format!("bad hex byte {:?}: {}", s, e))
        })
        .collect()
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = std::env::args().collect::<Vec<_>>();
    let text = match args.get(1) {
        Some(arg) => match arg.as_str() {
            "-h" | "--help" => {
                println!("usage: {} [hex-encoded DNS message]", &args[0]);
                return;
            }
            _ => arg.to_owned(),
        },
        None => {
            let mut text = String::new();
            if let Err(e) = std::io::stdin().lock().read_to_string(&mut text) {
                eprintln!("failed to read stdin: {}", e);
                std::process::exit(1);
            }
            text
        }
    };

    let input = match decode_hex(&text) {
        Ok(input) => input,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    };

    let grammar = DnsGrammar::new();
    let bump = Bump::new();
    match grammar.parse(&input, &bump) {
        Some(message) => print!("{}", message),
        None => {
            eprintln!("not a valid DNS message");
            std::process::exit(1);
        }
    }
}
