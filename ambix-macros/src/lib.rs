use darling::Error;
use darling::ast::NestedMeta;
use quote::quote;
use syn::{Data, DeriveInput, Fields, ItemStruct, parse_macro_input};

use proc_macro::TokenStream;

fn struct_members(input: &DeriveInput, derive: &str) -> Result<Vec<syn::Member>, syn::Error> {
    match input.data {
        Data::Struct(ref s) => Ok(match s.fields {
            Fields::Named(ref nf) => nf
                .named
                .iter()
                .filter_map(|f| f.ident.clone())
                .map(syn::Member::from)
                .collect(),
            Fields::Unnamed(ref uf) => uf
                .unnamed
                .iter()
                .enumerate()
                .map(|(i, _)| syn::Index::from(i).into())
                .collect(),
            Fields::Unit => Vec::new(),
        }),
        _ => Err(syn::Error::new_spanned(
            &input.ident,
            format!("{derive} can only be derived for structs"),
        )),
    }
}

#[proc_macro_derive(ToBytes)]
pub fn derive_to_bytes(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    let fields = match struct_members(&input, "ToBytes") {
        Ok(fields) => fields,
        Err(e) => return TokenStream::from(e.to_compile_error()),
    };
    let name = input.ident;

    let expanded = quote! {
        impl crate::byteorder::WriteBytesBe for #name {
            fn write_be(&self, dst: &mut Vec<u8>) {
                #( crate::byteorder::WriteBytesBe::write_be(&self.#fields, dst); )*
            }
        }

        impl crate::byteorder::WriteBytesLe for #name {
            fn write_le(&self, dst: &mut Vec<u8>) {
                #( crate::byteorder::WriteBytesLe::write_le(&self.#fields, dst); )*
            }
        }
    };

    TokenStream::from(expanded)
}

/// Reads every field in declaration order from a byte slice cursor.
#[proc_macro_derive(FromBytes)]
pub fn derive_from_bytes(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    let fields = match struct_members(&input, "FromBytes") {
        Ok(fields) => fields,
        Err(e) => return TokenStream::from(e.to_compile_error()),
    };
    let name = input.ident;

    let expanded = quote! {
        impl crate::byteorder::ReadBytesBe for #name {
            fn read_be(src: &mut &[u8]) -> ::std::io::Result<Self> {
                Ok(Self {
                    #( #fields: crate::byteorder::ReadBytesBe::read_be(src)?, )*
                })
            }
        }

        impl crate::byteorder::ReadBytesLe for #name {
            fn read_le(src: &mut &[u8]) -> ::std::io::Result<Self> {
                Ok(Self {
                    #( #fields: crate::byteorder::ReadBytesLe::read_le(src)?, )*
                })
            }
        }
    };

    TokenStream::from(expanded)
}

#[proc_macro_attribute]
pub fn caf_chunk_type(attr: TokenStream, item: TokenStream) -> TokenStream {
    let args = match NestedMeta::parse_meta_list(attr.into()) {
        Ok(v) => v,
        Err(e) => {
            return TokenStream::from(Error::from(e).write_errors());
        }
    };

    let Some(first) = args.first() else {
        return TokenStream::from(Error::custom("chunk_type expects a byte string").write_errors());
    };

    let type_bytes = match first {
        NestedMeta::Lit(syn::Lit::ByteStr(bs)) => bs.value(),
        _ => {
            return TokenStream::from(
                syn::Error::new_spanned(first, "chunk_type expects a byte string, e.g. b\"desc\"")
                    .to_compile_error(),
            );
        }
    };

    if type_bytes.len() != 4 {
        return TokenStream::from(
            syn::Error::new_spanned(first, "chunk_type expects 4 bytes").to_compile_error(),
        );
    }
    let type_bytes_tokens = {
        let b = type_bytes;
        quote! {[#(#b),*]}
    };

    let input = parse_macro_input!(item as ItemStruct);
    let name = &input.ident;

    let expanded = quote! {
        #input

        impl #name {
            pub const CHUNK_TYPE: [u8; 4] = #type_bytes_tokens;
        }

        impl crate::caf::CAFChunk for #name {
            fn chunk_type(&self) -> &[u8; 4] {
                &Self::CHUNK_TYPE
            }

            fn chunk_data(&self) -> Vec<u8> {
                let mut vec = Vec::new();
                crate::byteorder::WriteBytesBe::write_be(self, &mut vec);
                vec
            }
        }
    };
    TokenStream::from(expanded)
}
