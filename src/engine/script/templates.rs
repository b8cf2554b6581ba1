//! One call template per pass method.

use std::path::Path;

use super::format::{Call, Expr, py_path};
use super::{Dependency, ScriptBody, ScriptError};
use crate::engine::params::{
    ChromaFixParameters, ColorCorrectionParameters, CropBox, CropResizeParameters,
    DebandParameters, DeblockMethod, DeblockParameters, DehaloMethod, DehaloParameters,
    MethodChoice, MethodId, NoiseReductionMethod, NoiseReductionParameters, PassStep,
    QtgmcParameters, ResizeKernel, SharpenMethod, SharpenParameters, UpscaleMethod,
};

use Dependency::*;

/// Resolve a method selector or fail with the pass label
fn known<M: Copy + MethodId>(
    pass: &'static str,
    choice: &MethodChoice<M>,
) -> Result<M, ScriptError> {
    choice.known().ok_or_else(|| ScriptError::UnknownMethod {
        pass,
        id: choice.id().to_string(),
    })
}

pub(super) fn emit_step(body: &mut ScriptBody, step: &PassStep) -> Result<(), ScriptError> {
    let pass = step.label();
    match step {
        PassStep::Crop(crop) => emit_crop(body, crop),
        PassStep::Deinterlace(p) => emit_qtgmc(body, pass, p)?,
        PassStep::NoiseReduction(p) => emit_noise_reduction(body, pass, p)?,
        PassStep::Dehalo(p) => emit_dehalo(body, pass, p)?,
        PassStep::Deblock(p) => emit_deblock(body, pass, p)?,
        PassStep::Deband(p) => emit_deband(body, pass, p),
        PassStep::Sharpen(p) => emit_sharpen(body, pass, p)?,
        PassStep::ChromaFix(p) => emit_chroma_fix(body, pass, p)?,
        PassStep::ColorCorrection(p) => emit_color(body, pass, p)?,
        PassStep::Resize(p) => emit_resize(body, pass, p)?,
    }
    Ok(())
}

fn emit_crop(body: &mut ScriptBody, crop: &CropBox) {
    body.line(
        Call::on_clip("core.std.Crop")
            .kw("left", crop.left)
            .kw("right", crop.right)
            .kw("top", crop.top)
            .kw("bottom", crop.bottom)
            .assign(),
    );
}

/// QTGMC with only the arguments that differ from its preset defaults.
fn emit_qtgmc(
    body: &mut ScriptBody,
    pass: &'static str,
    p: &QtgmcParameters,
) -> Result<(), ScriptError> {
    let preset = known(pass, &p.preset)?;

    let mut deps = vec![Havsfunc, MvTools, if p.opencl { Nnedi3Cl } else { Nnedi3 }];
    if p
        .edi_mode
        .as_deref()
        .is_some_and(|mode| mode.to_ascii_uppercase().contains("EEDI3"))
    {
        deps.push(Eedi3);
    }
    if p.ez_denoise.is_some_and(|v| v > 0.0) || p.noise_process.is_some_and(|v| v > 0) {
        deps.push(Fft3dFilter);
    }
    body.require(pass, &deps);

    let call = Call::on_clip("haf.QTGMC")
        .kw("Preset", preset.id())
        .kw_opt("TFF", p.tff)
        .kw_unless("InputType", p.input_type, 0)
        .kw_unless("FPSDivisor", p.fps_divisor, 1)
        // Quality
        .kw_opt("TR0", p.tr0)
        .kw_opt("TR1", p.tr1)
        .kw_opt("TR2", p.tr2)
        .kw_opt("Rep0", p.rep0)
        .kw_unless("Rep1", p.rep1, 0)
        .kw_opt("Rep2", p.rep2)
        .kw_unless("RepChroma", p.rep_chroma, true)
        // Interpolation
        .kw_opt("EdiMode", p.edi_mode.as_deref())
        .kw_opt("NNSize", p.nn_size)
        .kw_opt("NNeurons", p.nn_neurons)
        .kw_unless("EdiQual", p.edi_qual, 1)
        .kw_opt("EdiMaxD", p.edi_max_d)
        .kw_opt(
            "ChromaEdi",
            Some(p.chroma_edi.as_str()).filter(|s| !s.is_empty()),
        )
        // Motion analysis
        .kw_opt("BlockSize", p.block_size)
        .kw_opt("Overlap", p.overlap)
        .kw_opt("Search", p.search)
        .kw_opt("SearchParam", p.search_param)
        .kw_opt("PelSearch", p.pel_search)
        .kw_opt("ChromaMotion", p.chroma_motion)
        .kw_unless("TrueMotion", p.true_motion, false)
        .kw_opt("Lambda", p.lambda)
        .kw_opt("LSAD", p.lsad)
        .kw_opt("PNew", p.p_new)
        .kw_opt("PLevel", p.p_level)
        .kw_unless("GlobalMotion", p.global_motion, true)
        .kw_unless("DCT", p.dct, 0)
        .kw_opt("SubPel", p.sub_pel)
        .kw_unless("SubPelInterp", p.sub_pel_interp, 2)
        // Thresholds
        .kw_unless("ThSAD1", p.th_sad1, 640)
        .kw_unless("ThSAD2", p.th_sad2, 256)
        .kw_unless("ThSCD1", p.th_scd1, 180)
        .kw_unless("ThSCD2", p.th_scd2, 98)
        // Sharpening
        .kw_opt("Sharpness", p.sharpness)
        .kw_opt("SMode", p.s_mode)
        .kw_opt("SLMode", p.sl_mode)
        .kw_opt("SLRad", p.sl_rad)
        .kw_unless("SOvs", p.s_ovs, 0)
        .kw_unless("SVThin", p.sv_thin, 0.0)
        .kw_opt("Sbb", p.sbb)
        .kw_opt("SrchClipPP", p.srch_clip_pp)
        // Noise
        .kw_opt("NoiseProcess", p.noise_process)
        .kw_opt("EZDenoise", p.ez_denoise)
        .kw_opt("EZKeepGrain", p.ez_keep_grain)
        .kw_unless("NoisePreset", p.noise_preset.as_str(), "Fast")
        .kw_opt("Denoiser", p.denoiser.as_deref())
        .kw_unless("FftThreads", p.fft_threads, 1)
        .kw_opt("DenoiseMC", p.denoise_mc)
        .kw_opt("NoiseTR", p.noise_tr)
        .kw_opt("Sigma", p.sigma)
        .kw_unless("ChromaNoise", p.chroma_noise, false)
        .kw_unless("ShowNoise", p.show_noise, 0.0)
        .kw_opt("GrainRestore", p.grain_restore)
        .kw_opt("NoiseRestore", p.noise_restore)
        .kw_opt("NoiseDeint", p.noise_deint.as_deref())
        .kw_opt("StabilizeNoise", p.stabilize_noise)
        // Source matching
        .kw_unless("SourceMatch", p.source_match, 0)
        .kw_opt("MatchPreset", p.match_preset.as_deref())
        .kw_opt("MatchEdi", p.match_edi.as_deref())
        .kw_opt("MatchPreset2", p.match_preset2.as_deref())
        .kw_opt("MatchEdi2", p.match_edi2.as_deref())
        .kw_unless("MatchTR2", p.match_tr2, 1)
        .kw_opt(
            "MatchEnhance",
            Some(p.match_enhance).filter(|v| (v - 0.5).abs() > 0.001),
        )
        .kw_unless("Lossless", p.lossless, 0)
        // Advanced
        .kw_unless("Border", p.border, false)
        .kw_opt("Precise", p.precise)
        .kw_unless("ForceTR", p.force_tr, 0)
        .kw_unless("Str", p.brighten_str, 2.0)
        .kw_unless("Amp", p.amp, 0.0625)
        .kw_unless("FastMA", p.fast_ma, false)
        .kw_unless("ESearchP", p.e_search_p, false)
        .kw_unless("RefineMotion", p.refine_motion, false)
        // havsfunc picks its code path from this, so it is always written
        .kw("opencl", p.opencl)
        .kw_opt("device", p.device);

    body.line(call.assign());
    Ok(())
}

/// MCTemporalDenoise `settings` for a profile name
fn mctd_settings(profile: &str) -> Option<&'static str> {
    match profile.trim().to_ascii_lowercase().as_str() {
        "veryfast" | "very fast" | "very low" | "verylow" => Some("very low"),
        "fast" | "low" => Some("low"),
        "medium" | "balanced" => Some("medium"),
        "slow" | "high" => Some("high"),
        "veryslow" | "very slow" | "very high" | "veryhigh" => Some("very high"),
        _ => None,
    }
}

fn emit_noise_reduction(
    body: &mut ScriptBody,
    pass: &'static str,
    p: &NoiseReductionParameters,
) -> Result<(), ScriptError> {
    known(pass, &p.preset)?;
    match known(pass, &p.method)? {
        NoiseReductionMethod::SmDegrain => {
            body.require(pass, &[Havsfunc, MvTools]);
            body.line(
                Call::on_clip("haf.SMDegrain")
                    .kw("tr", p.sm_degrain_tr)
                    .kw("thSAD", p.sm_degrain_th_sad)
                    .kw("thSADC", p.sm_degrain_th_sadc)
                    .kw("RefineMotion", p.sm_degrain_refine)
                    .kw("prefilter", p.sm_degrain_prefilter)
                    .assign(),
            );
        }
        NoiseReductionMethod::McTemporalDenoise => {
            let settings =
                mctd_settings(&p.mc_temporal_profile).ok_or_else(|| ScriptError::UnknownMethod {
                    pass,
                    id: p.mc_temporal_profile.clone(),
                })?;
            body.require(pass, &[Havsfunc, MvTools, Fft3dFilter]);
            body.line(
                Call::on_clip("haf.MCTemporalDenoise")
                    .kw("settings", settings)
                    .kw("sigma", p.mc_temporal_sigma)
                    .kw("radius", p.mc_temporal_radius)
                    .assign(),
            );
        }
        NoiseReductionMethod::QtgmcBuiltin => {
            let mut deps = vec![Havsfunc, MvTools, Nnedi3];
            if p.qtgmc_ez_denoise > 0.0 {
                deps.push(Fft3dFilter);
            }
            body.require(pass, &deps);
            // Progressive input: QTGMC as a temporal denoiser only
            body.line(
                Call::on_clip("haf.QTGMC")
                    .kw("Preset", "Slower")
                    .kw("InputType", 1)
                    .kw("EZDenoise", p.qtgmc_ez_denoise)
                    .kw("EZKeepGrain", p.qtgmc_ez_keep_grain)
                    .assign(),
            );
        }
    }
    Ok(())
}

fn emit_dehalo(
    body: &mut ScriptBody,
    pass: &'static str,
    p: &DehaloParameters,
) -> Result<(), ScriptError> {
    let call = match known(pass, &p.method)? {
        DehaloMethod::DehaloAlpha => Call::on_clip("haf.DeHalo_alpha")
            .kw("rx", p.rx)
            .kw("ry", p.ry)
            .kw("darkstr", p.dark_str)
            .kw("brightstr", p.bright_str),
        DehaloMethod::FineDehalo => Call::on_clip("haf.FineDehalo")
            .kw("rx", p.rx)
            .kw("ry", p.ry)
            .kw("thmi", p.low_threshold)
            .kw("thma", p.high_threshold)
            .kw("darkstr", p.dark_str)
            .kw("brightstr", p.bright_str),
        DehaloMethod::Yahr => Call::on_clip("haf.YAHR")
            .kw("blur", p.yahr_blur)
            .kw("depth", p.yahr_depth),
    };
    body.require(pass, &[Havsfunc]);
    body.line(call.assign());
    Ok(())
}

fn emit_deblock(
    body: &mut ScriptBody,
    pass: &'static str,
    p: &DeblockParameters,
) -> Result<(), ScriptError> {
    match known(pass, &p.method)? {
        DeblockMethod::DeblockQed => {
            body.require(pass, &[Havsfunc, Deblock, DctFilter]);
            body.line(
                Call::on_clip("haf.Deblock_QED")
                    .kw("quant1", p.quant1)
                    .kw("quant2", p.quant2)
                    .kw("aOff1", p.a_offset1)
                    .kw("aOff2", p.a_offset2)
                    .assign(),
            );
        }
        DeblockMethod::Deblock => {
            body.require(pass, &[Deblock]);
            body.line(
                Call::on_clip("core.deblock.Deblock")
                    .kw("quant", p.quant1)
                    .kw("aoffset", p.a_offset1)
                    .kw("boffset", p.a_offset2)
                    .assign(),
            );
        }
    }
    Ok(())
}

fn emit_deband(body: &mut ScriptBody, pass: &'static str, p: &DebandParameters) {
    body.require(pass, &[NeoF3kdb]);
    body.line(
        Call::on_clip("core.neo_f3kdb.Deband")
            .kw("range", p.range)
            .kw("y", p.y)
            .kw("cb", p.cb)
            .kw("cr", p.cr)
            .kw("grainy", p.grain_y)
            .kw("grainc", p.grain_c)
            .kw("dynamic_grain", p.dynamic_grain)
            .kw("output_depth", p.output_depth)
            .assign(),
    );
}

fn emit_sharpen(
    body: &mut ScriptBody,
    pass: &'static str,
    p: &SharpenParameters,
) -> Result<(), ScriptError> {
    match known(pass, &p.method)? {
        SharpenMethod::LsfMod => {
            body.require(pass, &[Havsfunc]);
            body.line(
                Call::on_clip("haf.LSFmod")
                    .kw("strength", p.strength)
                    .kw("overshoot", p.overshoot)
                    .kw("undershoot", p.undershoot)
                    .kw("soft", p.soft_edge)
                    .assign(),
            );
        }
        SharpenMethod::Cas => {
            body.require(pass, &[Cas]);
            body.line(
                Call::on_clip("core.cas.CAS")
                    .kw("sharpness", p.cas_sharpness)
                    .assign(),
            );
        }
    }
    Ok(())
}

fn emit_chroma_fix(
    body: &mut ScriptBody,
    pass: &'static str,
    p: &ChromaFixParameters,
) -> Result<(), ScriptError> {
    known(pass, &p.preset)?;

    if p.apply_chroma_bleeding_fix {
        body.require(pass, &[Havsfunc]);
        body.line(
            Call::on_clip("haf.FixChromaBleedingMod")
                .kw("cx", p.chroma_bleed_cx)
                .kw("cy", p.chroma_bleed_cy)
                .kw("strength", p.chroma_bleed_strength)
                .kw("blur", p.chroma_bleed_c_blur > 0.0)
                .assign(),
        );
    }
    if p.apply_de_crawl {
        body.require(pass, &[Havsfunc]);
        body.line(
            Call::on_clip("haf.LUTDeCrawl")
                .kw("ythresh", p.de_crawl_y_thresh)
                .kw("cthresh", p.de_crawl_c_thresh)
                .kw("maxdiff", p.de_crawl_max_diff)
                .assign(),
        );
    }
    if p.apply_vinverse {
        body.require(pass, &[Vinverse]);
        body.line(
            Call::on_clip("core.vinverse.Vinverse")
                .kw("sstr", p.vinverse_sstr)
                .kw("amnt", p.vinverse_amnt)
                .kw("scl", p.vinverse_scl)
                .assign(),
        );
    }
    Ok(())
}

fn emit_color(
    body: &mut ScriptBody,
    pass: &'static str,
    p: &ColorCorrectionParameters,
) -> Result<(), ScriptError> {
    known(pass, &p.preset)?;

    if p.has_tweak() {
        body.require(pass, &[Adjust]);
        body.line(
            Call::on_clip("adjust.Tweak")
                .kw("hue", p.hue)
                .kw("sat", p.saturation)
                .kw("bright", p.brightness)
                .kw("cont", p.contrast)
                .kw("coring", p.coring)
                .assign(),
        );
    }
    if p.apply_levels {
        body.require(pass, &[Havsfunc]);
        body.line(
            Call::on_clip("haf.SmoothLevels")
                .kw("input_low", p.input_low)
                .kw("gamma", p.gamma)
                .kw("input_high", p.input_high)
                .kw("output_low", p.output_low)
                .kw("output_high", p.output_high)
                .assign(),
        );
    }
    if !p.has_tweak() && !p.apply_levels {
        body.line("# no adjustments");
    }
    Ok(())
}

/// Width/height expressions for the target box, even-sized.
fn target_dimensions(p: &CropResizeParameters) -> Option<(String, String)> {
    let even = |expr: String| format!("round({} / 2) * 2", expr);
    match (p.target_width, p.target_height) {
        (None, None) => None,
        (Some(w), Some(h)) if !p.maintain_aspect => Some((w.to_string(), h.to_string())),
        (Some(w), Some(h)) => {
            let scale = format!("min({} / clip.width, {} / clip.height)", w, h);
            Some((
                even(format!("clip.width * {}", scale)),
                even(format!("clip.height * {}", scale)),
            ))
        }
        (Some(w), None) if p.maintain_aspect => Some((
            w.to_string(),
            even(format!("clip.height * {} / clip.width", w)),
        )),
        (Some(w), None) => Some((w.to_string(), "clip.height".to_string())),
        (None, Some(h)) if p.maintain_aspect => Some((
            even(format!("clip.width * {} / clip.height", h)),
            h.to_string(),
        )),
        (None, Some(h)) => Some(("clip.width".to_string(), h.to_string())),
    }
}

fn emit_resize(
    body: &mut ScriptBody,
    pass: &'static str,
    p: &CropResizeParameters,
) -> Result<(), ScriptError> {
    known(pass, &p.preset)?;
    let kernel = known(pass, &p.kernel)?;

    if p.use_integer_upscale {
        let factor = p.upscale_factor;
        match known(pass, &p.upscale_method)? {
            UpscaleMethod::Nnedi3Rpow2 => {
                body.require(pass, &[EdiRpow2, Nnedi3]);
                body.line(
                    Call::on_clip("edi_rpow2.nnedi3_rpow2")
                        .kw("rfactor", factor)
                        .assign(),
                );
            }
            UpscaleMethod::Eedi3Rpow2 => {
                body.require(pass, &[EdiRpow2, Eedi3]);
                body.line(
                    Call::on_clip("edi_rpow2.eedi3_rpow2")
                        .kw("rfactor", factor)
                        .assign(),
                );
            }
            UpscaleMethod::Spline36 => {
                body.line(
                    Call::on_clip("core.resize.Spline36")
                        .kw("width", Expr(format!("clip.width * {}", factor)))
                        .kw("height", Expr(format!("clip.height * {}", factor)))
                        .assign(),
                );
            }
        }
    }

    let Some((width, height)) = target_dimensions(p) else {
        return Ok(());
    };
    body.line(format!("width = {}", width));
    body.line(format!("height = {}", height));

    let call = match kernel {
        ResizeKernel::Spline36 => Call::on_clip("core.resize.Spline36"),
        ResizeKernel::Lanczos => Call::on_clip("core.resize.Lanczos"),
        ResizeKernel::Bicubic => Call::on_clip("core.resize.Bicubic"),
        ResizeKernel::Bilinear => Call::on_clip("core.resize.Bilinear"),
        ResizeKernel::Nnedi3 => {
            body.require(pass, &[EdiRpow2, Nnedi3]);
            Call::on_clip("edi_rpow2.nnedi3_rpow2").kw("rfactor", 2)
        }
        ResizeKernel::Eedi3 => {
            body.require(pass, &[EdiRpow2, Eedi3]);
            Call::on_clip("edi_rpow2.eedi3_rpow2").kw("rfactor", 2)
        }
    };
    body.line(
        call.kw("width", Expr("width".into()))
            .kw("height", Expr("height".into()))
            .assign(),
    );
    Ok(())
}

/// Convert to full-range RGB and write the clip's frames as PNG.
pub(super) fn emit_still(body: &mut ScriptBody, pattern: &Path) {
    body.line(String::new());
    body.line("matrix = \"709\" if clip.height >= 720 else \"170m\"");
    body.line(
        Call::on_clip("core.resize.Bicubic")
            .kw("format", Expr("vs.RGB24".into()))
            .kw("matrix_in_s", Expr("matrix".into()))
            .kw("range_in_s", "limited")
            .kw("range_s", "full")
            .assign(),
    );
    body.line(
        Call::on_clip("core.imwri.Write")
            .kw("imgformat", "PNG")
            .kw("filename", Expr(py_path(pattern)))
            .kw("firstnum", 0)
            .kw("overwrite", true)
            .assign(),
    );
}
