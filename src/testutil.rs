use rustls::{SignatureAlgorithm, SignatureScheme};
use std::cell::Cell;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::Arc;

use crate::alpn::AlpnList;
use crate::backend::{BackendError, TlsBackend};
use crate::identity::Pkcs11Options;
use crate::key_operation::{KeyOperationError, KeyOperationHandler};
use crate::version::{TlsCipherPreference, TlsVersion};

#[derive(Debug)]
pub(crate) struct NeverSigns;

impl KeyOperationHandler for NeverSigns {
    fn algorithm(&self) -> SignatureAlgorithm {
        SignatureAlgorithm::ECDSA
    }

    fn supported_schemes(&self) -> &[SignatureScheme] {
        &[SignatureScheme::ECDSA_NISTP256_SHA256]
    }

    fn sign(&self, _: SignatureScheme, _: &[u8]) -> Result<Vec<u8>, KeyOperationError> {
        Err(KeyOperationError(String::from("never signs")))
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum Call {
    InitDefault,
    InitMtls,
    InitMtlsFromPath,
    InitPkcs11,
    InitCustomKeyOperation,
    InitPkcs12,
    InitSystemStore,
    OverrideTrustStore,
    OverrideTrustStoreFromPath,
    MinimumTlsVersion(TlsVersion),
    CipherPreference(TlsCipherPreference),
    VerifyPeer(bool),
    AlpnList,
}

/// Options of a [`RecordingBackend`]. Identity initialisation resets them
/// the way a real backend does, except for the call log.
#[derive(Debug)]
pub(crate) struct RecordingOptions {
    pub(crate) calls: Vec<Call>,
    pub(crate) certificate: Option<Vec<u8>>,
    pub(crate) trust: Option<Vec<u8>>,
    pub(crate) trust_paths: Option<(Option<PathBuf>, Option<PathBuf>)>,
    pub(crate) alpn: Vec<String>,
    live: Rc<Cell<usize>>,
}

impl RecordingOptions {
    pub(crate) fn position(&self, call: &Call) -> usize {
        self.calls
            .iter()
            .position(|c| c == call)
            .unwrap_or_else(|| panic!("{:?} not in {:?}", call, self.calls))
    }

    fn reset(&mut self, call: Call, certificate: Option<&[u8]>) {
        self.calls.push(call);
        self.certificate = certificate.map(<[u8]>::to_vec);
        self.trust = None;
        self.trust_paths = None;
        self.alpn.clear();
    }
}

impl Drop for RecordingOptions {
    fn drop(&mut self) {
        self.live.set(self.live.get() - 1);
    }
}

#[derive(Debug, Default)]
pub(crate) struct RecordingBackend {
    reject: Option<Call>,
    identity_inits: Cell<usize>,
    live: Rc<Cell<usize>>,
}

impl RecordingBackend {
    pub(crate) fn rejecting(call: Call) -> Self {
        Self {
            reject: Some(call),
            ..Default::default()
        }
    }

    /// How many identity initialisations were attempted, across all options.
    pub(crate) fn identity_inits(&self) -> usize {
        self.identity_inits.get()
    }

    /// How many options created by this backend have not been dropped.
    pub(crate) fn live_options(&self) -> usize {
        self.live.get()
    }

    fn check(&self, call: &Call) -> Result<(), BackendError> {
        if self.reject.as_ref() == Some(call) {
            Err(BackendError::Rejected(format!("{:?} rejected", call)))
        } else {
            Ok(())
        }
    }

    fn init(
        &self,
        options: &mut RecordingOptions,
        call: Call,
        certificate: Option<&[u8]>,
    ) -> Result<(), BackendError> {
        self.identity_inits.set(self.identity_inits.get() + 1);
        self.check(&call)?;
        options.reset(call, certificate);
        Ok(())
    }
}

impl TlsBackend for RecordingBackend {
    type Options = RecordingOptions;
    type Context = Vec<Call>;

    fn init_client_default(&self) -> RecordingOptions {
        self.live.set(self.live.get() + 1);
        RecordingOptions {
            calls: vec![Call::InitDefault],
            certificate: None,
            trust: None,
            trust_paths: None,
            alpn: Vec::new(),
            live: Rc::clone(&self.live),
        }
    }

    fn init_client_mtls(
        &self,
        options: &mut RecordingOptions,
        certificate: &[u8],
        _: &[u8],
    ) -> Result<(), BackendError> {
        self.init(options, Call::InitMtls, Some(certificate))
    }

    fn init_client_mtls_from_path(
        &self,
        options: &mut RecordingOptions,
        _: &Path,
        _: &Path,
    ) -> Result<(), BackendError> {
        self.init(options, Call::InitMtlsFromPath, None)
    }

    fn init_client_mtls_with_pkcs11(
        &self,
        options: &mut RecordingOptions,
        pkcs11: &Pkcs11Options,
    ) -> Result<(), BackendError> {
        let certificate = pkcs11.certificate_file_contents.as_ref();
        self.init(
            options,
            Call::InitPkcs11,
            certificate.map(|c| c.as_bytes()),
        )
    }

    fn init_client_mtls_with_custom_key_operation(
        &self,
        options: &mut RecordingOptions,
        _: &Arc<dyn KeyOperationHandler>,
        certificate: &[u8],
    ) -> Result<(), BackendError> {
        self.init(options, Call::InitCustomKeyOperation, Some(certificate))
    }

    fn init_client_mtls_pkcs12_from_path(
        &self,
        options: &mut RecordingOptions,
        _: &Path,
        _: &[u8],
    ) -> Result<(), BackendError> {
        self.init(options, Call::InitPkcs12, None)
    }

    fn init_client_mtls_from_system_store(
        &self,
        options: &mut RecordingOptions,
        _: &str,
    ) -> Result<(), BackendError> {
        self.init(options, Call::InitSystemStore, None)
    }

    fn override_trust_store(
        &self,
        options: &mut RecordingOptions,
        ca: &[u8],
    ) -> Result<(), BackendError> {
        self.check(&Call::OverrideTrustStore)?;
        options.calls.push(Call::OverrideTrustStore);
        options.trust = Some(ca.to_vec());
        Ok(())
    }

    fn override_trust_store_from_path(
        &self,
        options: &mut RecordingOptions,
        ca_dir: Option<&Path>,
        ca_file: Option<&Path>,
    ) -> Result<(), BackendError> {
        self.check(&Call::OverrideTrustStoreFromPath)?;
        options.calls.push(Call::OverrideTrustStoreFromPath);
        options.trust_paths = Some((
            ca_dir.map(Path::to_path_buf),
            ca_file.map(Path::to_path_buf),
        ));
        Ok(())
    }

    fn set_minimum_tls_version(&self, options: &mut RecordingOptions, version: TlsVersion) {
        options.calls.push(Call::MinimumTlsVersion(version));
    }

    fn set_cipher_preference(
        &self,
        options: &mut RecordingOptions,
        preference: TlsCipherPreference,
    ) {
        options.calls.push(Call::CipherPreference(preference));
    }

    fn set_verify_peer(&self, options: &mut RecordingOptions, verify_peer: bool) {
        options.calls.push(Call::VerifyPeer(verify_peer));
    }

    fn set_alpn_list(
        &self,
        options: &mut RecordingOptions,
        alpn: &AlpnList,
    ) -> Result<(), BackendError> {
        self.check(&Call::AlpnList)?;
        options.calls.push(Call::AlpnList);
        options.alpn = alpn.protocols().to_vec();
        Ok(())
    }

    fn is_alpn_available(&self) -> bool {
        true
    }

    fn is_cipher_preference_supported(&self, preference: TlsCipherPreference) -> bool {
        matches!(
            preference,
            TlsCipherPreference::SystemDefault | TlsCipherPreference::PqDefault
        )
    }

    fn create_context(&self, options: &RecordingOptions) -> Result<Vec<Call>, BackendError> {
        Ok(options.calls.clone())
    }
}
