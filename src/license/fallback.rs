//! Static package-name → license table.
//!
//! Consulted only after native metadata and copyright files fail. Rules are
//! scanned in order and the first matching pattern wins, so specific
//! patterns precede broader ones (`libzstd*` before `libz*`). The last rule
//! is a catch-all mapping everything else to [`OSI_APPROVED_LICENSE`].

use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

use crate::config::glob_match;
use crate::model::OSI_APPROVED_LICENSE;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FallbackRule {
    /// Exact name or `*` glob.
    pub pattern: String,
    pub license: String,
}

impl FallbackRule {
    pub fn new(pattern: impl Into<String>, license: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            license: license.into(),
        }
    }

    pub fn matches(&self, name: &str) -> bool {
        glob_match(&self.pattern, name)
    }
}

const BUILTIN_RULES: &[(&str, &str)] = &[
    // C library and toolchain runtime
    ("libc6", "LGPL-2.1"),
    ("libc6-*", "LGPL-2.1"),
    ("libc-bin", "LGPL-2.1"),
    ("libc-dev-bin", "LGPL-2.1"),
    ("libc-l10n", "LGPL-2.1"),
    ("locales", "LGPL-2.1"),
    ("glibc*", "LGPL-2.1"),
    ("libcrypt*", "LGPL-2.1"),
    ("libgcc*", "GPL-3.0-with-GCC-exception"),
    ("libstdc++*", "GPL-3.0-with-GCC-exception"),
    ("libgomp*", "GPL-3.0-with-GCC-exception"),
    ("libatomic*", "GPL-3.0-with-GCC-exception"),
    ("libquadmath*", "GPL-3.0-with-GCC-exception"),
    ("gcc-*-base", "GPL-3.0-with-GCC-exception"),
    ("gcc*", "GPL-3.0"),
    ("cpp*", "GPL-3.0"),
    ("g++*", "GPL-3.0"),
    ("binutils*", "GPL-3.0"),
    ("libbinutils*", "GPL-3.0"),
    ("musl*", "MIT"),
    // Cryptography
    ("libssl*", "Apache-2.0"),
    ("openssl*", "Apache-2.0"),
    ("libgnutls*", "LGPL-2.1"),
    ("libgcrypt*", "LGPL-2.1"),
    ("libgpg-error*", "LGPL-2.1"),
    ("libnettle*", "LGPL-3.0"),
    ("libhogweed*", "LGPL-3.0"),
    ("libtasn1*", "LGPL-2.1"),
    ("libp11-kit*", "BSD-3-Clause"),
    ("libidn2*", "LGPL-3.0"),
    ("libunistring*", "LGPL-3.0"),
    ("libkrb5*", "MIT"),
    ("libk5crypto*", "MIT"),
    ("libgssapi-krb5*", "MIT"),
    ("libkrb5support*", "MIT"),
    ("krb5*", "MIT"),
    ("libsodium*", "ISC"),
    ("libseccomp*", "LGPL-2.1"),
    ("ca-certificates*", "MPL-2.0"),
    // Compression
    ("libzstd*", "BSD-3-Clause"),
    ("zstd", "BSD-3-Clause"),
    ("zlib*", "Zlib"),
    ("libz*", "Zlib"),
    ("libbz2*", "bzip2-1.0.6"),
    ("bzip2", "bzip2-1.0.6"),
    ("liblzma*", "0BSD"),
    ("xz*", "0BSD"),
    ("liblz4*", "BSD-2-Clause"),
    ("lz4", "BSD-2-Clause"),
    ("libbrotli*", "MIT"),
    // Graphics, fonts and media
    ("libpng*", "Libpng"),
    ("libjpeg*", "IJG"),
    ("libtiff*", "libtiff"),
    ("libwebp*", "BSD-3-Clause"),
    ("libgif*", "MIT"),
    ("libfreetype*", "FTL"),
    ("freetype*", "FTL"),
    ("libfontconfig*", "MIT"),
    ("fontconfig*", "MIT"),
    ("libcairo*", "LGPL-2.1"),
    ("libpixman*", "MIT"),
    ("libharfbuzz*", "MIT"),
    ("libx11*", "MIT"),
    ("libxcb*", "MIT"),
    ("libxau*", "MIT"),
    ("libxdmcp*", "MIT"),
    ("libxext*", "MIT"),
    ("libxrender*", "MIT"),
    // Parsing, text and storage
    ("libxml2*", "MIT"),
    ("libxslt*", "MIT"),
    ("libexpat*", "MIT"),
    ("libyaml*", "MIT"),
    ("libjson-c*", "MIT"),
    ("libpcre*", "BSD-3-Clause"),
    ("libonig*", "BSD-2-Clause"),
    ("libicu*", "ICU"),
    ("libffi*", "MIT"),
    ("libedit*", "BSD-3-Clause"),
    ("libreadline*", "GPL-3.0"),
    ("readline*", "GPL-3.0"),
    ("libncurses*", "MIT"),
    ("libtinfo*", "MIT"),
    ("ncurses*", "MIT"),
    ("libsqlite3*", "blessing"),
    ("sqlite*", "blessing"),
    ("libdb5*", "Sleepycat"),
    ("libgdbm*", "GPL-3.0"),
    ("libgmp*", "LGPL-3.0"),
    ("libmpfr*", "LGPL-3.0"),
    ("libmpc*", "LGPL-3.0"),
    // Networking
    ("libcurl*", "curl"),
    ("curl", "curl"),
    ("libnghttp2*", "MIT"),
    ("libpsl*", "MIT"),
    ("libssh2*", "BSD-3-Clause"),
    ("libssh-*", "LGPL-2.1"),
    ("libldap*", "OLDAP-2.8"),
    ("librtmp*", "LGPL-2.1"),
    ("libtirpc*", "BSD-3-Clause"),
    ("libnsl*", "LGPL-2.1"),
    // System libraries
    ("libsystemd*", "LGPL-2.1"),
    ("libudev*", "LGPL-2.1"),
    ("systemd*", "LGPL-2.1"),
    ("libacl*", "LGPL-2.1"),
    ("libattr*", "LGPL-2.1"),
    ("libcap-ng*", "LGPL-2.1"),
    ("libcap*", "BSD-3-Clause"),
    ("libpam*", "BSD-3-Clause"),
    ("libaudit*", "LGPL-2.1"),
    ("libblkid*", "LGPL-2.1"),
    ("libmount*", "LGPL-2.1"),
    ("libfdisk*", "LGPL-2.1"),
    ("libuuid*", "BSD-3-Clause"),
    ("libsmartcols*", "BSD-3-Clause"),
    ("libsemanage*", "LGPL-2.1"),
    ("libsepol*", "LGPL-2.1"),
    ("libcom-err*", "MIT"),
    ("libext2fs*", "GPL-2.0"),
    ("libkeyutils*", "LGPL-2.1"),
    ("libelf*", "LGPL-3.0"),
    ("libdw*", "LGPL-3.0"),
    ("libapt-pkg*", "GPL-2.0"),
    ("libgit2*", "GPL-2.0-with-linking-exception"),
    // Interpreters and runtimes
    ("python*", "PSF-2.0"),
    ("libpython*", "PSF-2.0"),
    ("perl*", "Artistic-1.0-Perl OR GPL-1.0-or-later"),
    ("libperl*", "Artistic-1.0-Perl OR GPL-1.0-or-later"),
    ("ruby*", "Ruby"),
    ("libruby*", "Ruby"),
    ("nodejs*", "MIT"),
    ("libnode*", "MIT"),
    ("openjdk*", "GPL-2.0-with-classpath-exception"),
    ("golang*", "BSD-3-Clause"),
    ("php*", "PHP-3.01"),
    ("lua*", "MIT"),
    ("liblua*", "MIT"),
    ("tcl*", "TCL"),
    // Alpine base
    ("busybox*", "GPL-2.0"),
    ("ssl_client", "GPL-2.0"),
    ("apk-tools*", "GPL-2.0"),
    ("alpine-baselayout*", "GPL-2.0"),
    ("alpine-keys", "MIT"),
    ("alpine-release", "MIT"),
    ("scanelf", "GPL-2.0"),
    ("pax-utils", "GPL-2.0"),
    // RPM base
    ("rpm*", "GPL-2.0"),
    ("librpm*", "GPL-2.0"),
    ("dnf*", "GPL-2.0"),
    ("libdnf*", "GPL-2.0"),
    ("yum*", "GPL-2.0"),
    // Core system packages
    ("bash", "GPL-3.0"),
    ("coreutils", "GPL-3.0"),
    ("tar", "GPL-3.0"),
    ("grep", "GPL-3.0"),
    ("sed", "GPL-3.0"),
    ("findutils", "GPL-3.0"),
    ("diffutils", "GPL-3.0"),
    ("gzip", "GPL-3.0"),
    ("gawk", "GPL-3.0"),
    ("make", "GPL-3.0"),
    ("patch", "GPL-3.0"),
    ("wget", "GPL-3.0"),
    ("nano", "GPL-3.0"),
    ("cpio", "GPL-3.0"),
    ("less", "GPL-3.0"),
    ("gpgv*", "GPL-3.0"),
    ("gnupg*", "GPL-3.0"),
    ("gpg*", "GPL-3.0"),
    ("adduser", "GPL-2.0"),
    ("apt", "GPL-2.0"),
    ("apt-*", "GPL-2.0"),
    ("base-files", "GPL-2.0"),
    ("base-passwd", "GPL-2.0"),
    ("debianutils", "GPL-2.0"),
    ("dpkg*", "GPL-2.0"),
    ("hostname", "GPL-2.0"),
    ("init-system-helpers", "GPL-2.0"),
    ("mount", "GPL-2.0"),
    ("util-linux*", "GPL-2.0"),
    ("bsdutils", "GPL-2.0"),
    ("sysvinit-utils", "GPL-2.0"),
    ("procps", "GPL-2.0"),
    ("iproute2", "GPL-2.0"),
    ("iputils*", "GPL-2.0"),
    ("e2fsprogs", "GPL-2.0"),
    ("kmod", "GPL-2.0"),
    ("lsb-base", "GPL-2.0"),
    ("netbase", "GPL-2.0"),
    ("sensible-utils", "GPL-2.0"),
    ("mawk", "GPL-2.0"),
    ("git*", "GPL-2.0"),
    ("login", "BSD-3-Clause"),
    ("passwd", "BSD-3-Clause"),
    ("shadow*", "BSD-3-Clause"),
    ("dash", "BSD-3-Clause"),
    ("debconf*", "BSD-2-Clause"),
    ("openssh*", "BSD-2-Clause"),
    ("sudo", "ISC"),
    ("vim*", "Vim"),
    // Everything else
    ("*", OSI_APPROVED_LICENSE),
];

static BUILTIN: LazyLock<Vec<FallbackRule>> = LazyLock::new(|| {
    BUILTIN_RULES
        .iter()
        .map(|(pattern, license)| FallbackRule::new(*pattern, *license))
        .collect()
});

/// Ordered, first-match-wins rule list.
#[derive(Debug, Clone)]
pub struct FallbackTable {
    rules: Vec<FallbackRule>,
}

impl FallbackTable {
    pub fn new(rules: Vec<FallbackRule>) -> Self {
        Self { rules }
    }

    /// The built-in table, ending with the catch-all.
    pub fn builtin() -> Self {
        Self::new(BUILTIN.clone())
    }

    /// The built-in table with `overrides` consulted first.
    pub fn with_overrides(overrides: Vec<FallbackRule>) -> Self {
        let mut rules = overrides;
        rules.extend(BUILTIN.iter().cloned());
        Self::new(rules)
    }

    /// First rule matching `package`. Debian multiarch qualifiers
    /// (`libc6:amd64`) are ignored, as are rules with a blank license.
    pub fn lookup(&self, package: &str) -> Option<&FallbackRule> {
        let name = package.split(':').next().unwrap_or(package);
        self.rules
            .iter()
            .find(|rule| !rule.license.trim().is_empty() && rule.matches(name))
    }

    pub fn rules(&self) -> &[FallbackRule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl Default for FallbackTable {
    fn default() -> Self {
        Self::builtin()
    }
}
