// Copyright 2024 OctoFHIR Team
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Function and aggregate identities
//!
//! Each vocabulary has its own closed enum; [`Function`] ties them together
//! with the primitive casts and the placeholder used for unresolved extension
//! functions. Core functions are named by their SPARQL keyword, every other
//! function by its full URI.

use std::borrow::Cow;
use std::fmt;

use crate::model::Iri;
use crate::model::vocab::{self, xsd};

/// Core SPARQL built-in functions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum SparqlFunction {
    Abs,
    Bound,
    Ceil,
    Coalesce,
    Concat,
    Contains,
    Datatype,
    Day,
    EncodeForUri,
    Floor,
    Hours,
    If,
    Iri,
    IsBlank,
    IsIri,
    IsLiteral,
    IsNumeric,
    Lang,
    LangMatches,
    LCase,
    Md5,
    Minutes,
    Month,
    Now,
    Regex,
    Round,
    SameTerm,
    Seconds,
    Sha1,
    Sha256,
    Sha384,
    Sha512,
    Str,
    StrDt,
    StrEnds,
    StrLang,
    StrLen,
    StrStarts,
    Substr,
    Timezone,
    Tz,
    UCase,
    Year,
}

impl SparqlFunction {
    /// SPARQL keyword
    pub fn keyword(self) -> &'static str {
        match self {
            Self::Abs => "ABS",
            Self::Bound => "BOUND",
            Self::Ceil => "CEIL",
            Self::Coalesce => "COALESCE",
            Self::Concat => "CONCAT",
            Self::Contains => "CONTAINS",
            Self::Datatype => "DATATYPE",
            Self::Day => "DAY",
            Self::EncodeForUri => "ENCODE_FOR_URI",
            Self::Floor => "FLOOR",
            Self::Hours => "HOURS",
            Self::If => "IF",
            Self::Iri => "IRI",
            Self::IsBlank => "ISBLANK",
            Self::IsIri => "ISIRI",
            Self::IsLiteral => "ISLITERAL",
            Self::IsNumeric => "ISNUMERIC",
            Self::Lang => "LANG",
            Self::LangMatches => "LANGMATCHES",
            Self::LCase => "LCASE",
            Self::Md5 => "MD5",
            Self::Minutes => "MINUTES",
            Self::Month => "MONTH",
            Self::Now => "NOW",
            Self::Regex => "REGEX",
            Self::Round => "ROUND",
            Self::SameTerm => "SAMETERM",
            Self::Seconds => "SECONDS",
            Self::Sha1 => "SHA1",
            Self::Sha256 => "SHA256",
            Self::Sha384 => "SHA384",
            Self::Sha512 => "SHA512",
            Self::Str => "STR",
            Self::StrDt => "STRDT",
            Self::StrEnds => "STRENDS",
            Self::StrLang => "STRLANG",
            Self::StrLen => "STRLEN",
            Self::StrStarts => "STRSTARTS",
            Self::Substr => "SUBSTR",
            Self::Timezone => "TIMEZONE",
            Self::Tz => "TZ",
            Self::UCase => "UCASE",
            Self::Year => "YEAR",
        }
    }
}

/// XPath functions with their own evaluation
///
/// `fn:not`, `fn:true`, `fn:false` and `fn:matches` resolve to operator,
/// constant and core REGEX nodes and have no entry here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum XPathFunction {
    Boolean,
    Contains,
    StartsWith,
    EndsWith,
    StringLength,
    Concat,
    Substring,
    SubstringAfter,
    SubstringBefore,
    NormalizeSpace,
    NormalizeUnicode,
    UpperCase,
    LowerCase,
    EncodeForUri,
    Replace,
    EscapeHtmlUri,
    Compare,
    Abs,
    Ceiling,
    Floor,
    Round,
    RoundHalfToEven,
    YearFromDateTime,
    MonthFromDateTime,
    DayFromDateTime,
    HoursFromDateTime,
    MinutesFromDateTime,
    SecondsFromDateTime,
    TimezoneFromDateTime,
}

impl XPathFunction {
    /// Local name in the XPath functions namespace
    pub fn local_name(self) -> &'static str {
        match self {
            Self::Boolean => "boolean",
            Self::Contains => "contains",
            Self::StartsWith => "starts-with",
            Self::EndsWith => "ends-with",
            Self::StringLength => "string-length",
            Self::Concat => "concat",
            Self::Substring => "substring",
            Self::SubstringAfter => "substring-after",
            Self::SubstringBefore => "substring-before",
            Self::NormalizeSpace => "normalize-space",
            Self::NormalizeUnicode => "normalize-unicode",
            Self::UpperCase => "upper-case",
            Self::LowerCase => "lower-case",
            Self::EncodeForUri => "encode-for-uri",
            Self::Replace => "replace",
            Self::EscapeHtmlUri => "escape-html-uri",
            Self::Compare => "compare",
            Self::Abs => "abs",
            Self::Ceiling => "ceiling",
            Self::Floor => "floor",
            Self::Round => "round",
            Self::RoundHalfToEven => "round-half-to-even",
            Self::YearFromDateTime => "year-from-dateTime",
            Self::MonthFromDateTime => "month-from-dateTime",
            Self::DayFromDateTime => "day-from-dateTime",
            Self::HoursFromDateTime => "hours-from-dateTime",
            Self::MinutesFromDateTime => "minutes-from-dateTime",
            Self::SecondsFromDateTime => "seconds-from-dateTime",
            Self::TimezoneFromDateTime => "timezone-from-dateTime",
        }
    }
}

/// Jena ARQ compatibility functions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum ArqFunction {
    BNode,
    E,
    LocalName,
    Namespace,
    Max,
    Min,
    Now,
    Pi,
    Sha1Sum,
    /// Zero-based substring, shared by `afn:substr` and `afn:substring`
    Substring,
    StrJoin,
}

impl ArqFunction {
    /// Local name in the ARQ function namespace
    pub fn local_name(self) -> &'static str {
        match self {
            Self::BNode => "bnode",
            Self::E => "e",
            Self::LocalName => "localname",
            Self::Namespace => "namespace",
            Self::Max => "max",
            Self::Min => "min",
            Self::Now => "now",
            Self::Pi => "pi",
            Self::Sha1Sum => "sha1sum",
            Self::Substring => "substring",
            Self::StrJoin => "strjoin",
        }
    }
}

/// Trigonometric function family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum Trigonometry {
    Sine,
    Cosine,
    Tangent,
    Secant,
    Cosecant,
    Cotangent,
}

impl Trigonometry {
    /// Local name of the forward function
    pub fn local_name(self) -> &'static str {
        match self {
            Self::Sine => "sin",
            Self::Cosine => "cos",
            Self::Tangent => "tan",
            Self::Secant => "sec",
            Self::Cosecant => "cosec",
            Self::Cotangent => "cotan",
        }
    }
}

/// Leviathan extension functions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LeviathanFunction {
    /// MD5 digest of a string
    Md5Hash,
    /// SHA-256 digest of a string
    Sha256Hash,
    /// Random double, optionally bounded
    Random,
    /// Trigonometric function, inverse when the flag is set
    Trigonometric(Trigonometry, bool),
    /// Degrees to radians
    DegreesToRadians,
    /// Radians to degrees
    RadiansToDegrees,
    /// Logarithm, base 10 unless given
    Log,
    /// Natural logarithm
    Ln,
    /// e raised to the argument
    E,
    /// 10 raised to the argument
    Ten,
    /// x raised to y
    Power,
    /// x squared
    Square,
    /// x cubed
    Cube,
    /// Square root
    SquareRoot,
    /// y-th root of x
    Root,
    /// Hypotenuse of two sides
    Pythagoras,
    /// Euclidean distance between two 2D or 3D points
    Cartesian,
    /// Integer factorial
    Factorial,
    /// 1 / x
    Reciprocal,
}

impl LeviathanFunction {
    /// Local name in the Leviathan namespace
    pub fn local_name(self) -> Cow<'static, str> {
        let name = match self {
            Self::Md5Hash => "md5hash",
            Self::Sha256Hash => "sha256hash",
            Self::Random => "rnd",
            Self::Trigonometric(family, false) => family.local_name(),
            Self::Trigonometric(family, true) => {
                return Cow::Owned(format!("{}-1", family.local_name()));
            }
            Self::DegreesToRadians => "degrees-to-radians",
            Self::RadiansToDegrees => "radians-to-degrees",
            Self::Log => "log",
            Self::Ln => "ln",
            Self::E => "e",
            Self::Ten => "ten",
            Self::Power => "pow",
            Self::Square => "sq",
            Self::Cube => "cube",
            Self::SquareRoot => "sqrt",
            Self::Root => "root",
            Self::Pythagoras => "pythagoras",
            Self::Cartesian => "cartesian",
            Self::Factorial => "factorial",
            Self::Reciprocal => "reciprocal",
        };
        Cow::Borrowed(name)
    }
}

/// Primitive cast targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum CastTarget {
    Boolean,
    DateTime,
    Decimal,
    Double,
    Float,
    Integer,
    String,
}

impl CastTarget {
    /// Cast target named by a datatype URI; xsd:int is an alias of xsd:integer
    pub fn from_datatype(uri: &str) -> Option<Self> {
        match uri {
            xsd::BOOLEAN => Some(Self::Boolean),
            xsd::DATE_TIME => Some(Self::DateTime),
            xsd::DECIMAL => Some(Self::Decimal),
            xsd::DOUBLE => Some(Self::Double),
            xsd::FLOAT => Some(Self::Float),
            xsd::INTEGER | xsd::INT => Some(Self::Integer),
            xsd::STRING => Some(Self::String),
            _ => None,
        }
    }

    /// Datatype URI produced by the cast
    pub fn datatype(self) -> &'static str {
        match self {
            Self::Boolean => xsd::BOOLEAN,
            Self::DateTime => xsd::DATE_TIME,
            Self::Decimal => xsd::DECIMAL,
            Self::Double => xsd::DOUBLE,
            Self::Float => xsd::FLOAT,
            Self::Integer => xsd::INTEGER,
            Self::String => xsd::STRING,
        }
    }
}

/// A resolved scalar function
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Function {
    /// Core SPARQL built-in
    Sparql(SparqlFunction),
    /// XPath function
    XPath(XPathFunction),
    /// ARQ function
    Arq(ArqFunction),
    /// Leviathan function
    Leviathan(LeviathanFunction),
    /// Primitive cast
    Cast(CastTarget),
    /// Placeholder for an extension function nobody resolved
    Unknown(Iri),
}

impl Function {
    /// Keyword for core functions, full URI for everything else
    pub fn functor(&self) -> Cow<'static, str> {
        match self {
            Function::Sparql(f) => Cow::Borrowed(f.keyword()),
            Function::XPath(f) => Cow::Owned(format!("{}{}", vocab::XPATH_FUNCTIONS, f.local_name())),
            Function::Arq(f) => Cow::Owned(format!("{}{}", vocab::ARQ_FUNCTIONS, f.local_name())),
            Function::Leviathan(f) => {
                Cow::Owned(format!("{}{}", vocab::LEVIATHAN_FUNCTIONS, f.local_name()))
            }
            Function::Cast(target) => Cow::Borrowed(target.datatype()),
            Function::Unknown(iri) => Cow::Owned(iri.as_str().to_string()),
        }
    }

    /// Whether two evaluations with the same inputs always agree
    pub fn is_deterministic(&self) -> bool {
        !matches!(
            self,
            Function::Sparql(SparqlFunction::Now)
                | Function::Arq(ArqFunction::Now)
                | Function::Leviathan(LeviathanFunction::Random)
                | Function::Unknown(_)
        )
    }

    /// Whether the function is written with its keyword rather than a URI
    pub fn is_keyword(&self) -> bool {
        matches!(self, Function::Sparql(_))
    }
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_keyword() {
            f.write_str(&self.functor())
        } else {
            write!(f, "<{}>", self.functor())
        }
    }
}

/// Aggregate computations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Aggregate {
    /// AVG
    Avg,
    /// COUNT
    Count,
    /// GROUP_CONCAT
    GroupConcat,
    /// MAX
    Max,
    /// MIN
    Min,
    /// SAMPLE
    Sample,
    /// SUM
    Sum,
    /// fn:string-join
    StringJoin,
    /// lfn:all, true when every value is true
    All,
    /// lfn:any, true when some value is true
    Any,
    /// lfn:none, true when no value is true
    None,
    /// lfn:nmax, numeric maximum ignoring non-numeric values
    NumericMax,
    /// lfn:nmin, numeric minimum ignoring non-numeric values
    NumericMin,
    /// lfn:mode, most frequent value
    Mode,
    /// lfn:median
    Median,
}

impl Aggregate {
    /// Keyword for core aggregates, full URI for everything else
    pub fn functor(self) -> Cow<'static, str> {
        let leviathan = |name: &str| Cow::Owned(format!("{}{name}", vocab::LEVIATHAN_FUNCTIONS));
        match self {
            Self::Avg => Cow::Borrowed("AVG"),
            Self::Count => Cow::Borrowed("COUNT"),
            Self::GroupConcat => Cow::Borrowed("GROUP_CONCAT"),
            Self::Max => Cow::Borrowed("MAX"),
            Self::Min => Cow::Borrowed("MIN"),
            Self::Sample => Cow::Borrowed("SAMPLE"),
            Self::Sum => Cow::Borrowed("SUM"),
            Self::StringJoin => Cow::Owned(format!("{}string-join", vocab::XPATH_FUNCTIONS)),
            Self::All => leviathan("all"),
            Self::Any => leviathan("any"),
            Self::None => leviathan("none"),
            Self::NumericMax => leviathan("nmax"),
            Self::NumericMin => leviathan("nmin"),
            Self::Mode => leviathan("mode"),
            Self::Median => leviathan("median"),
        }
    }

    /// Whether the aggregate is a core keyword
    pub fn is_keyword(self) -> bool {
        matches!(
            self,
            Self::Avg | Self::Count | Self::GroupConcat | Self::Max | Self::Min | Self::Sample | Self::Sum
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_functors() {
        assert_eq!(Function::Sparql(SparqlFunction::EncodeForUri).functor(), "ENCODE_FOR_URI");
        assert_eq!(
            Function::XPath(XPathFunction::StartsWith).functor(),
            "http://www.w3.org/2005/xpath-functions#starts-with"
        );
        assert_eq!(
            Function::Leviathan(LeviathanFunction::Trigonometric(Trigonometry::Cosecant, true)).functor(),
            "http://www.dotnetrdf.org/leviathan#cosec-1"
        );
        assert_eq!(Aggregate::GroupConcat.functor(), "GROUP_CONCAT");
        assert_eq!(Aggregate::Median.functor(), "http://www.dotnetrdf.org/leviathan#median");
    }

    #[test]
    fn test_cast_targets() {
        assert_eq!(CastTarget::from_datatype(xsd::INT), Some(CastTarget::Integer));
        assert_eq!(CastTarget::from_datatype(xsd::LONG), None);
        assert_eq!(CastTarget::Integer.datatype(), xsd::INTEGER);
    }

    #[test]
    fn test_determinism() {
        assert!(!Function::Sparql(SparqlFunction::Now).is_deterministic());
        assert!(!Function::Leviathan(LeviathanFunction::Random).is_deterministic());
        assert!(Function::Sparql(SparqlFunction::Abs).is_deterministic());
    }
}
