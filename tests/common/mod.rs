//! Fixtures shared by the integration tests

#![allow(dead_code)]

use aes::Aes256;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use cfb_mode::cipher::{AsyncStreamCipher, KeyIvInit};
use md5::{Digest, Md5};
use rsa::{Oaep, RsaPrivateKey, RsaPublicKey};
use sha2::Sha256;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// A form with a text field, an integer, a photo, one repeat and meta
pub const HOUSEHOLD_FORM: &str = r#"<?xml version="1.0"?>
<h:html xmlns="http://www.w3.org/2002/xforms"
        xmlns:h="http://www.w3.org/1999/xhtml"
        xmlns:jr="http://openrosa.org/javarosa">
  <h:head>
    <h:title>Household</h:title>
    <model>
      <instance>
        <data id="household">
          <name/>
          <age/>
          <photo/>
          <g jr:template="">
            <x/>
          </g>
          <meta>
            <instanceID/>
          </meta>
        </data>
      </instance>
      <bind nodeset="/data/name" type="string"/>
      <bind nodeset="/data/age" type="int"/>
      <bind nodeset="/data/photo" type="binary"/>
      <bind nodeset="/data/g/x" type="int"/>
      <bind nodeset="/data/meta/instanceID" type="string"/>
      {SUBMISSION}
    </model>
  </h:head>
  <h:body>
    <input ref="/data/name"/>
    <input ref="/data/age"/>
    <upload ref="/data/photo" mediatype="image/*"/>
    <group ref="/data/g">
      <repeat nodeset="/data/g">
        <input ref="/data/g/x"/>
      </repeat>
    </group>
  </h:body>
</h:html>
"#;

/// Writes the household form, plain or encrypted, and returns its path
pub fn write_form(dir: &Path, encrypted: bool) -> PathBuf {
    let submission = if encrypted {
        r#"<submission base64RsaPublicKey="MIIBIjANBgkq" method="form-data-post"/>"#
    } else {
        ""
    };
    let path = dir.join("household.xml");
    fs::write(&path, HOUSEHOLD_FORM.replace("{SUBMISSION}", submission)).unwrap();
    path
}

/// Plain submission body with the given repeat values
pub fn household_submission(instance_id: &str, date: &str, name: &str, xs: &[i32]) -> String {
    let groups: String = xs.iter().map(|x| format!("<g><x>{x}</x></g>")).collect();
    format!(
        r#"<data id="household" instanceID="{instance_id}" submissionDate="{date}"><name>{name}</name><age>30</age><photo/>{groups}<meta><instanceID>{instance_id}</instanceID></meta></data>"#
    )
}

/// Writes `<form_dir>/instances/<dir>/submission.xml` and returns the directory
pub fn write_plain_submission(form_dir: &Path, dir: &str, body: &str) -> PathBuf {
    let instance_dir = form_dir.join("instances").join(dir);
    fs::create_dir_all(&instance_dir).unwrap();
    fs::write(instance_dir.join("submission.xml"), body).unwrap();
    instance_dir
}

/// A test key pair, generated once per test binary
pub fn test_key() -> &'static RsaPrivateKey {
    static KEY: OnceLock<RsaPrivateKey> = OnceLock::new();
    KEY.get_or_init(|| RsaPrivateKey::new(&mut rand::thread_rng(), 1024).unwrap())
}

fn pkcs5_pad(data: &[u8]) -> Vec<u8> {
    let pad = 16 - data.len() % 16;
    let mut padded = data.to_vec();
    padded.extend(std::iter::repeat(pad as u8).take(pad));
    padded
}

fn md5_hex(data: &[u8]) -> String {
    Md5::digest(data).iter().map(|b| format!("{b:02x}")).collect()
}

/// Encrypts a submission the way collection clients do
///
/// Media files are encrypted first in the given order, then the payload.
/// With `tamper_signature` the signature covers different content, so the
/// submission decrypts fine but fails validation.
pub struct EncryptedSubmission<'a> {
    pub form_id: &'a str,
    pub instance_id: &'a str,
    pub submission_date: &'a str,
    pub payload: &'a str,
    pub media: Vec<(&'a str, Vec<u8>)>,
    pub tamper_signature: bool,
}

impl EncryptedSubmission<'_> {
    pub fn write(&self, form_dir: &Path, dir: &str, public_key: &RsaPublicKey) -> PathBuf {
        let mut rng = rand::thread_rng();
        let instance_dir = form_dir.join("instances").join(dir);
        fs::create_dir_all(&instance_dir).unwrap();

        let key: [u8; 32] = rand::random();
        let wrapped_key = STANDARD.encode(
            public_key
                .encrypt(&mut rng, Oaep::new::<Sha256>(), &key)
                .unwrap(),
        );

        let mut seed_hasher = Md5::new();
        seed_hasher.update(self.instance_id.as_bytes());
        seed_hasher.update(key);
        let digest = seed_hasher.finalize();
        let mut iv = [0u8; 16];
        iv.copy_from_slice(&digest);
        let mut counter = 0usize;
        let mut encrypt = |plain: &[u8]| -> Vec<u8> {
            iv[counter % 16] = iv[counter % 16].wrapping_add(1);
            counter += 1;
            let mut buffer = pkcs5_pad(plain);
            cfb_mode::Encryptor::<Aes256>::new_from_slices(&key, &iv)
                .unwrap()
                .encrypt(&mut buffer);
            buffer
        };

        let mut signature_text = format!("{}\n{}\n{}\n", self.form_id, wrapped_key, self.instance_id);
        let mut media_elements = String::new();
        for (name, content) in &self.media {
            fs::write(instance_dir.join(format!("{name}.enc")), encrypt(content)).unwrap();
            signature_text.push_str(&format!("{name}::{}\n", md5_hex(content)));
            media_elements.push_str(&format!("<media><file>{name}.enc</file></media>"));
        }
        fs::write(
            instance_dir.join("submission.xml.enc"),
            encrypt(self.payload.as_bytes()),
        )
        .unwrap();
        signature_text.push_str(&format!(
            "submission.xml::{}\n",
            md5_hex(self.payload.as_bytes())
        ));

        if self.tamper_signature {
            signature_text.push_str("tampered\n");
        }
        let signature_digest = Md5::digest(signature_text.as_bytes());
        let signature = STANDARD.encode(
            public_key
                .encrypt(&mut rng, Oaep::new::<Sha256>(), &signature_digest)
                .unwrap(),
        );

        let manifest = format!(
            r#"<data id="{form_id}" encrypted="yes" submissionDate="{date}" xmlns="http://www.opendatakit.org/xforms/encrypted" xmlns:orx="http://openrosa.org/xforms"><base64EncryptedKey>{wrapped_key}</base64EncryptedKey><orx:meta><orx:instanceID>{instance_id}</orx:instanceID></orx:meta>{media_elements}<encryptedXmlFile>submission.xml.enc</encryptedXmlFile><base64EncryptedElementSignature>{signature}</base64EncryptedElementSignature></data>"#,
            form_id = self.form_id,
            date = self.submission_date,
            instance_id = self.instance_id,
        );
        fs::write(instance_dir.join("submission.xml"), manifest).unwrap();
        instance_dir
    }
}

/// Reads a CSV file into its header and records
pub fn read_csv(path: &Path) -> (Vec<String>, Vec<Vec<String>>) {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)
        .unwrap();
    let header = reader
        .headers()
        .unwrap()
        .iter()
        .map(str::to_string)
        .collect();
    let rows = reader
        .records()
        .map(|record| record.unwrap().iter().map(str::to_string).collect())
        .collect();
    (header, rows)
}

/// Index of a column in a header
pub fn column(header: &[String], name: &str) -> usize {
    header
        .iter()
        .position(|h| h == name)
        .unwrap_or_else(|| panic!("column {name} not in {header:?}"))
}
