//! Tokens: verified chains of Datalog-carrying blocks.
//!
//! A token is minted from an authority block signed by a root key, then
//! narrowed offline by appending blocks — each one can only add checks and
//! facts trusted under its own origin, never widen what earlier blocks
//! granted. Verification recomputes the signature chain against the root
//! public key; authorization hands the verified blocks to an
//! [`Authorizer`].

pub mod authorizer;
pub mod block;
pub mod format;

pub use authorizer::Authorizer;
pub use block::Block;
pub use format::{ExternalSignature, Proof, SerializedToken, SignedBlock};

use crate::builder::{BlockBuilder, TokenBuilder};
use crate::crypto::{
    external_payload, DefaultVerifier, KeyPair, RootKeyProvider, SignatureVerifier, Signer,
};
use crate::datalog::SymbolTable;
use crate::error::{FormatError, Result, TokenError};

/// A verified token: parsed blocks, the token-level symbol table, and the
/// signed container it came from.
#[derive(Debug, Clone)]
pub struct Token {
    pub(crate) root_key_id: Option<u32>,
    pub(crate) authority: Block,
    pub(crate) blocks: Vec<Block>,
    pub(crate) symbols: SymbolTable,
    pub(crate) container: SerializedToken,
}

impl Token {
    /// Start building a new token's authority block.
    pub fn builder() -> TokenBuilder {
        TokenBuilder::new()
    }

    pub(crate) fn mint(
        root: &dyn Signer,
        root_key_id: Option<u32>,
        builder: BlockBuilder,
    ) -> Result<Self> {
        let mut symbols = SymbolTable::new();
        let authority = builder.build(&mut symbols)?;
        let data = authority.to_bytes()?;
        let next = KeyPair::generate();
        let container = SerializedToken::new(root, root_key_id, data, &next)?;
        log::debug!("minted token with authority block, {} symbol(s)", symbols.current_offset());
        Ok(Self {
            root_key_id,
            authority,
            blocks: Vec::new(),
            symbols,
            container,
        })
    }

    /// Attenuate: append a block signed by the current holder key.
    ///
    /// The new block's symbols extend the token-level table, so they stay
    /// disjoint from every earlier block by construction.
    pub fn append(&self, builder: BlockBuilder) -> Result<Self> {
        let mut symbols = self.symbols.clone();
        let block = builder.build(&mut symbols)?;
        let data = block.to_bytes()?;
        let next = KeyPair::generate();
        let container = self.container.append(&next, data, None)?;

        let mut blocks = self.blocks.clone();
        blocks.push(block);
        Ok(Self {
            root_key_id: self.root_key_id,
            authority: self.authority.clone(),
            blocks,
            symbols,
            container,
        })
    }

    /// Append a block signed by a third party, carrying its own symbol
    /// table. Facts from such a block are only trusted by rules that name
    /// the signer's public key in a scope.
    pub fn append_third_party(
        &self,
        external: &dyn Signer,
        builder: BlockBuilder,
    ) -> Result<Self> {
        let mut block_symbols = SymbolTable::new();
        let mut block = builder.build(&mut block_symbols)?;
        block.external_key = Some(external.public_key());
        let data = block.to_bytes()?;

        let previous = self
            .container
            .blocks
            .last()
            .ok_or(FormatError::EmptyToken)?;
        let signature = external
            .sign(&external_payload(&data, &previous.signature))
            .map_err(TokenError::Format)?;

        let next = KeyPair::generate();
        let container = self.container.append(
            &next,
            data,
            Some(ExternalSignature {
                public_key: external.public_key(),
                signature,
            }),
        )?;

        let mut blocks = self.blocks.clone();
        blocks.push(block);
        Ok(Self {
            root_key_id: self.root_key_id,
            authority: self.authority.clone(),
            blocks,
            symbols: self.symbols.clone(),
            container,
        })
    }

    /// Seal the token, preventing any further attenuation.
    pub fn seal(&self) -> Result<Self> {
        Ok(Self {
            root_key_id: self.root_key_id,
            authority: self.authority.clone(),
            blocks: self.blocks.clone(),
            symbols: self.symbols.clone(),
            container: self.container.seal()?,
        })
    }

    /// Verify raw token bytes against a root key and parse the blocks.
    pub fn from_bytes(data: &[u8], root: &impl RootKeyProvider) -> Result<Self> {
        Self::from_bytes_with_verifier(data, root, &DefaultVerifier)
    }

    /// Same as [`Token::from_bytes`] with an injected signature verifier
    /// (e.g. one that understands SECP256R1).
    pub fn from_bytes_with_verifier(
        data: &[u8],
        root: &impl RootKeyProvider,
        verifier: &dyn SignatureVerifier,
    ) -> Result<Self> {
        let container = SerializedToken::from_bytes(data)?;
        let root_key = root
            .choose(container.root_key_id)
            .map_err(TokenError::Format)?;
        container.verify(&root_key, verifier)?;
        Self::from_container(container)
    }

    pub fn from_base64(data: &str, root: &impl RootKeyProvider) -> Result<Self> {
        let container = SerializedToken::from_base64(data)?;
        let root_key = root
            .choose(container.root_key_id)
            .map_err(TokenError::Format)?;
        container.verify(&root_key, &DefaultVerifier)?;
        Self::from_container(container)
    }

    fn from_container(container: SerializedToken) -> Result<Self> {
        let mut parsed = container.blocks.iter();
        let authority_block = parsed.next().ok_or(FormatError::EmptyToken)?;
        let authority = Block::from_bytes(&authority_block.data)?;
        if authority.external_key.is_some() {
            return Err(FormatError::Deserialization(
                "the authority block cannot be externally signed".to_string(),
            )
            .into());
        }

        let mut symbols = SymbolTable::new();
        symbols.extend(&authority.symbols);
        for key in &authority.public_keys {
            symbols.insert_public_key(key.clone());
        }

        let mut blocks = Vec::new();
        for signed in parsed {
            let block = Block::from_bytes(&signed.data)?;
            if block.external_key.is_none() {
                if !symbols.disjoint(&block.symbols) {
                    return Err(FormatError::SymbolTableOverlap.into());
                }
                symbols.extend(&block.symbols);
                for key in &block.public_keys {
                    symbols.insert_public_key(key.clone());
                }
            }
            blocks.push(block);
        }

        Ok(Self {
            root_key_id: container.root_key_id,
            authority,
            blocks,
            symbols,
            container,
        })
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        self.container.to_bytes()
    }

    pub fn to_base64(&self) -> Result<String> {
        self.container.to_base64()
    }

    /// Create an authorizer bound to this token.
    pub fn authorizer(&self) -> Result<Authorizer> {
        Authorizer::for_token(self.clone())
    }

    /// Total number of blocks, the authority block included.
    pub fn block_count(&self) -> usize {
        1 + self.blocks.len()
    }

    /// The authority block.
    pub fn authority(&self) -> &Block {
        &self.authority
    }

    /// The attenuation blocks, in chain order.
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// Context strings per block, in chain order.
    pub fn contexts(&self) -> Vec<Option<&str>> {
        std::iter::once(self.authority.context.as_deref())
            .chain(self.blocks.iter().map(|b| b.context.as_deref()))
            .collect()
    }

    /// One revocation identifier per block.
    pub fn revocation_ids(&self) -> Vec<Vec<u8>> {
        self.container.revocation_ids()
    }

    /// Render every block's Datalog content for inspection.
    pub fn print(&self) -> String {
        let mut out = String::new();
        out.push_str("Token {\n");
        out.push_str(&render_block(&self.authority, 0, &self.symbols));
        for (i, block) in self.blocks.iter().enumerate() {
            if block.external_key.is_some() {
                let local = block.local_symbol_table();
                out.push_str(&render_block(block, i + 1, &local));
            } else {
                out.push_str(&render_block(block, i + 1, &self.symbols));
            }
        }
        out.push('}');
        out
    }
}

fn render_block(block: &Block, index: usize, symbols: &SymbolTable) -> String {
    let mut out = String::new();
    if index == 0 {
        out.push_str("\tauthority {\n");
    } else if block.external_key.is_some() {
        out.push_str(&format!("\tblock {index} (third-party) {{\n"));
    } else {
        out.push_str(&format!("\tblock {index} {{\n"));
    }
    for fact in &block.facts {
        out.push_str(&format!("\t\t{};\n", symbols.format_fact(fact)));
    }
    for rule in &block.rules {
        out.push_str(&format!("\t\t{};\n", symbols.format_rule(rule)));
    }
    for check in &block.checks {
        out.push_str(&format!("\t\t{};\n", symbols.format_check(check)));
    }
    out.push_str("\t}\n");
    out
}
